use anyhow::Result;
use owo_colors::OwoColorize;

use crate::app::App;

pub async fn run(app: App) -> Result<()> {
    calbridge_provider_google::authorize(&app.settings.google, app.store.as_ref()).await?;

    println!("{}", "Google Calendar access authorized.".green());
    println!("Run `calbridge sync` to mirror events now.");

    Ok(())
}
