//! The calendar side of the bridge.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::BridgeResult;
use crate::event::SourceEvent;

#[async_trait]
pub trait SourceEventFetcher: Send + Sync {
    /// Upcoming events starting before `window_end`, ordered by start time.
    ///
    /// Recurring events come back expanded into single occurrences. Events
    /// without a usable start are dropped rather than failing the fetch.
    async fn list_upcoming(&self, window_end: DateTime<Utc>) -> BridgeResult<Vec<SourceEvent>>;

    /// Delete an event from the calendar. An already-deleted event is not an error.
    async fn delete_event(&self, event_id: &str) -> BridgeResult<()>;
}
