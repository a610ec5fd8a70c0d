use anyhow::Result;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

use crate::app::App;
use crate::render::Render;

pub async fn run(app: App) -> Result<()> {
    let shutdown = CancellationToken::new();
    super::cancel_on_ctrl_c(&shutdown);

    let summary = app
        .reconciler
        .run_with_deadline(app.settings.call_timeout, &shutdown)
        .await?;

    for failure in &summary.failures {
        println!(
            "   {} {} {}",
            failure.kind.render(),
            failure.source_id,
            failure.error.red()
        );
    }

    if summary.is_noop() {
        println!("{}", "Everything up to date".dimmed());
    } else {
        println!("{}", summary.render());
    }

    Ok(())
}
