use anyhow::Result;
use chrono::Utc;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

use crate::app::App;
use crate::render::PlanRender;

/// Show what the next pass would do without applying it.
pub async fn run(app: App, verbose: bool) -> Result<()> {
    let now = Utc::now();
    let plan = app
        .reconciler
        .plan_at(now, &CancellationToken::new())
        .await?;

    println!(
        "{} {}",
        "Window ends".dimmed(),
        plan.window_end.format("%Y-%m-%d %H:%M UTC")
    );
    println!("{}", plan.render(verbose));

    Ok(())
}
