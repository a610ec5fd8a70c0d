pub mod authorize;
pub mod links;
pub mod mirror_delete;
pub mod status;
pub mod sync;
pub mod watch;

use tokio_util::sync::CancellationToken;

/// Cancel `token` on Ctrl-C.
pub fn cancel_on_ctrl_c(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down");
            token.cancel();
        }
    });
}
