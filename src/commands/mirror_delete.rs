use anyhow::Result;
use owo_colors::OwoColorize;

use crate::app::App;

/// Propagate the deletion of a scheduled event back to the calendar.
pub async fn run(app: App, sink_id: &str) -> Result<()> {
    if !app.settings.reconciler.mirror_deletes_upstream {
        anyhow::bail!("MIRROR_DELETES_UPSTREAM is off; refusing to delete calendar events");
    }

    match app.reconciler.handle_sink_deleted(sink_id).await? {
        Some(link) => println!(
            "{} calendar event {} (scheduled event {})",
            "Deleted".red(),
            link.source_id,
            link.sink_id
        ),
        None => println!("{}", "Nothing to delete".dimmed()),
    }

    Ok(())
}
