//! Outbound incident notifications.

use async_trait::async_trait;
use serde::Serialize;

/// A message for whoever operates the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub headline: String,
    pub error: Option<String>,
    /// Item payload (usually JSON) so failures can be debugged without logs
    pub context: Option<String>,
}

impl Notice {
    pub fn info(headline: impl Into<String>) -> Self {
        Notice {
            headline: headline.into(),
            error: None,
            context: None,
        }
    }

    pub fn failure(headline: impl Into<String>, error: impl ToString) -> Self {
        Notice {
            headline: headline.into(),
            error: Some(error.to_string()),
            context: None,
        }
    }

    /// Attach `item` as pretty JSON. Serialization failures leave the notice as is.
    pub fn with_item<T: Serialize>(mut self, item: &T) -> Self {
        self.context = serde_json::to_string_pretty(item).ok();
        self
    }
}

/// Fire-and-forget delivery: implementations log their own failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &Notice);
}

/// Notifier that only writes to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: &Notice) {
        match &notice.error {
            Some(error) => tracing::error!(
                context = notice.context.as_deref().unwrap_or(""),
                "{}: {}",
                notice.headline,
                error
            ),
            None => tracing::info!("{}", notice.headline),
        }
    }
}
