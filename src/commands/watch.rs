use anyhow::Result;
use calbridge_core::BridgeError;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::app::App;
use crate::render::Render;

/// Run a pass every `SYNC_INTERVAL` until Ctrl-C or a fatal error.
///
/// The first pass starts immediately. A pass that overruns the interval
/// delays the next tick instead of overlapping with it.
pub async fn run(app: App) -> Result<()> {
    let shutdown = CancellationToken::new();
    super::cancel_on_ctrl_c(&shutdown);

    let mut ticker = interval(app.settings.sync_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(interval = ?app.settings.sync_interval, "Watching for calendar changes");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = app
            .reconciler
            .run_with_deadline(app.settings.call_timeout, &shutdown)
            .await;

        match result {
            Ok(summary) if summary.is_noop() => {}
            Ok(summary) => info!("{}", summary.render()),
            Err(BridgeError::Cancelled) if shutdown.is_cancelled() => break,
            Err(e) if e.is_fatal() => {
                error!("Stopping: {}", e);
                return Err(e.into());
            }
            // Pass aborts and timeouts were logged and notified; retry next tick
            Err(_) => {}
        }
    }

    Ok(())
}
