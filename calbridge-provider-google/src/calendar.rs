//! Google Calendar as the source of upcoming events.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use calbridge_core::source::SourceEventFetcher;
use calbridge_core::{BridgeError, BridgeResult, EventTime, SourceEvent};
use chrono::{DateTime, Utc};
use google_calendar::types::{OrderBy, SendUpdates};
use tracing::debug;

use crate::from_google::to_source_event;
use crate::session::Session;

pub struct GoogleCalendar {
    session: Arc<Session>,
    calendar_id: String,
    /// Result cap applied after filtering; `None` returns everything in the window
    max_results: Option<usize>,
}

impl GoogleCalendar {
    pub fn new(session: Arc<Session>, calendar_id: &str, max_results: Option<usize>) -> Self {
        GoogleCalendar {
            session,
            calendar_id: calendar_id.to_string(),
            max_results,
        }
    }
}

#[async_trait]
impl SourceEventFetcher for GoogleCalendar {
    async fn list_upcoming(&self, window_end: DateTime<Utc>) -> BridgeResult<Vec<SourceEvent>> {
        let client = self.session.client().await?;

        let time_min = Utc::now().to_rfc3339();
        let time_max = window_end.to_rfc3339();

        // Single events expands recurring events into their occurrences,
        // which is also what lets Google order by start time.
        let response = client
            .events()
            .list_all(
                &self.calendar_id,
                "",
                0,
                OrderBy::StartTime,
                &[],
                "", // search query
                &[],
                false,
                false,
                true,
                &time_max,
                &time_min,
                "",
                "",
            )
            .await
            .map_err(|e| classify("Failed to fetch events", e))?;

        let fetched = response.body.len();
        let events: Vec<SourceEvent> = response
            .body
            .into_iter()
            .filter_map(to_source_event)
            .filter(|e| starts_before(e, window_end))
            .take(self.max_results.unwrap_or(usize::MAX))
            .collect();

        debug!(
            calendar_id = %self.calendar_id,
            fetched,
            kept = events.len(),
            "Fetched upcoming events"
        );

        Ok(events)
    }

    async fn delete_event(&self, event_id: &str) -> BridgeResult<()> {
        let client = self.session.client().await?;

        let result = client
            .events()
            .delete(&self.calendar_id, event_id, false, SendUpdates::None)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let error_str = e.to_string();
                if is_gone(&error_str) {
                    debug!(event_id, "Calendar event already deleted");
                    Ok(())
                } else {
                    Err(classify(&format!("Failed to delete event {event_id}"), e))
                }
            }
        }
    }
}

// Date-only events are placed with the configured offset, which only the
// reconciler knows; it applies the exact window check for those.
fn starts_before(event: &SourceEvent, window_end: DateTime<Utc>) -> bool {
    match event.start {
        EventTime::DateTime(start) => start < window_end,
        EventTime::Date(_) => true,
    }
}

fn is_gone(error_str: &str) -> bool {
    error_str.contains("404")
        || error_str.contains("410")
        || error_str.contains("Not Found")
        || error_str.contains("Gone")
}

fn classify(what: &str, e: impl Display) -> BridgeError {
    let message = format!("{what}: {e}");
    if message.contains("401") || message.contains("invalid_grant") || message.contains("Unauthorized") {
        BridgeError::Auth(message)
    } else {
        BridgeError::Source(message)
    }
}
