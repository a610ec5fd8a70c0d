//! Provider-neutral event types.
//!
//! The calendar side produces [`SourceEvent`]s, the scheduled-event side
//! stores [`SinkEvent`]s. A [`SinkEventSpec`] is what gets sent to the sink
//! when a source event is mirrored.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;
pub const MAX_LOCATION_CHARS: usize = 100;

/// Location used when the calendar event has none (the sink requires one).
pub const FALLBACK_LOCATION: &str = "TBA";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventTime {
    DateTime(DateTime<Utc>),
    /// All-day value. For end times this is the last included day.
    Date(NaiveDate),
}

impl EventTime {
    /// Start instant; date-only values begin at midnight in `offset`.
    pub fn start_instant(&self, offset: FixedOffset) -> DateTime<Utc> {
        match self {
            EventTime::DateTime(dt) => *dt,
            EventTime::Date(date) => local_to_utc(*date, Duration::zero(), offset),
        }
    }

    /// End instant; date-only values end at 23:59:59 in `offset`.
    pub fn end_instant(&self, offset: FixedOffset) -> DateTime<Utc> {
        match self {
            EventTime::DateTime(dt) => *dt,
            EventTime::Date(date) => local_to_utc(*date, Duration::seconds(86_399), offset),
        }
    }
}

fn local_to_utc(date: NaiveDate, since_midnight: Duration, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN) + since_midnight;
    (local - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

/// An upcoming event read from the source calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEvent {
    pub id: String,
    pub title: String,
    pub start: EventTime,
    pub end: EventTime,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Link to the event in the calendar's web UI
    pub html_link: Option<String>,
}

impl SourceEvent {
    /// True when the event starts strictly before `window_end`.
    pub fn starts_before(&self, window_end: DateTime<Utc>, offset: FixedOffset) -> bool {
        self.start.start_instant(offset) < window_end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SinkEventKind {
    StageInstance,
    Voice,
    /// Location-based event, the only kind calbridge creates
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Privacy {
    GuildOnly,
}

/// A scheduled event as it exists in the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub kind: SinkEventKind,
}

/// Fields of a scheduled event to be created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkEventSpec {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: Option<String>,
    pub location: String,
    pub kind: SinkEventKind,
    pub privacy: Privacy,
}

impl SinkEventSpec {
    /// Build the external scheduled event mirroring `event`.
    ///
    /// Text fields are truncated to the sink's limits rather than rejected.
    pub fn from_source(event: &SourceEvent, all_day_offset: FixedOffset) -> Self {
        let location = event
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(FALLBACK_LOCATION);

        SinkEventSpec {
            title: truncate_chars(&event.title, MAX_NAME_CHARS),
            start: event.start.start_instant(all_day_offset),
            end: event.end.end_instant(all_day_offset),
            description: event
                .description
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(|d| truncate_chars(d, MAX_DESCRIPTION_CHARS)),
            location: truncate_chars(location, MAX_LOCATION_CHARS),
            kind: SinkEventKind::External,
            privacy: Privacy::GuildOnly,
        }
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.title.trim().is_empty() {
            return Err(BridgeError::SinkCreate("event name is empty".into()));
        }
        if self.end <= self.start {
            return Err(BridgeError::SinkCreate(format!(
                "'{}' ends ({}) before it starts ({})",
                self.title,
                self.end.to_rfc3339(),
                self.start.to_rfc3339()
            )));
        }
        Ok(())
    }
}

/// Cut `s` to at most `max` characters, on a character boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
