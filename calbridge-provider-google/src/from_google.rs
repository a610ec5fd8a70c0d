use calbridge_core::{EventTime, SourceEvent};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use google_calendar::types::EventDateTime;

/// Convert a Google event, or `None` if it is cancelled or has no usable start.
pub(crate) fn to_source_event(event: google_calendar::types::Event) -> Option<SourceEvent> {
    if event.status == "cancelled" || event.id.is_empty() {
        return None;
    }

    let start = event.start.as_ref().and_then(event_time)?;
    // A missing end falls back to the start, which the sink then rejects per item
    let end = event
        .end
        .as_ref()
        .and_then(event_time)
        .unwrap_or_else(|| start.clone());
    let end = inclusive_end(&start, end);

    Some(SourceEvent {
        id: event.id,
        title: if event.summary.is_empty() {
            "(No title)".to_string()
        } else {
            event.summary
        },
        start,
        end,
        description: non_empty(event.description),
        location: non_empty(event.location),
        html_link: non_empty(event.html_link),
    })
}

fn event_time(time: &EventDateTime) -> Option<EventTime> {
    to_event_time(time.date_time, time.date)
}

pub(crate) fn to_event_time(
    date_time: Option<DateTime<Utc>>,
    date: Option<NaiveDate>,
) -> Option<EventTime> {
    match (date_time, date) {
        (Some(dt), _) => Some(EventTime::DateTime(dt)),
        (None, Some(d)) => Some(EventTime::Date(d)),
        (None, None) => None,
    }
}

/// Google all-day end dates are exclusive; turn them into the last included day.
pub(crate) fn inclusive_end(start: &EventTime, end: EventTime) -> EventTime {
    match (start, end) {
        (EventTime::Date(start), EventTime::Date(end)) if end > *start => {
            EventTime::Date(end - Duration::days(1))
        }
        (_, end) => end,
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}
