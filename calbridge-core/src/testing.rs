//! In-memory collaborators for reconciler tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio_util::sync::CancellationToken;

use crate::error::{BridgeError, BridgeResult};
use crate::event::{EventTime, SinkEvent, SinkEventKind, SinkEventSpec, SourceEvent};
use crate::link::{LinkRecord, LinkStore};
use crate::notify::{Notice, Notifier};
use crate::sink::SinkEventManager;
use crate::source::SourceEventFetcher;

pub fn event_at(id: &str, start: DateTime<Utc>) -> SourceEvent {
    SourceEvent {
        id: id.to_string(),
        title: format!("Event {id}"),
        start: EventTime::DateTime(start),
        end: EventTime::DateTime(start + Duration::hours(2)),
        description: Some(format!("Description of {id}")),
        location: Some("Community hall".to_string()),
        html_link: None,
    }
}

#[derive(Default)]
pub struct FakeCalendar {
    events: Mutex<Vec<SourceEvent>>,
    deleted: Mutex<Vec<String>>,
    last_window_end: Mutex<Option<DateTime<Utc>>>,
    fail_fetch: AtomicBool,
    hang_fetch: AtomicBool,
}

impl FakeCalendar {
    pub fn set(&self, events: Vec<SourceEvent>) {
        *self.events.lock().unwrap() = events;
    }

    pub fn fail_fetch(&self) {
        self.fail_fetch.store(true, Ordering::SeqCst);
    }

    /// Make every fetch wait forever.
    pub fn hang_fetch(&self) {
        self.hang_fetch.store(true, Ordering::SeqCst);
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn last_window_end(&self) -> Option<DateTime<Utc>> {
        *self.last_window_end.lock().unwrap()
    }
}

#[async_trait]
impl SourceEventFetcher for FakeCalendar {
    async fn list_upcoming(&self, window_end: DateTime<Utc>) -> BridgeResult<Vec<SourceEvent>> {
        *self.last_window_end.lock().unwrap() = Some(window_end);
        if self.hang_fetch.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(BridgeError::Source("connection reset".into()));
        }
        Ok(self.events.lock().unwrap().clone())
    }

    async fn delete_event(&self, event_id: &str) -> BridgeResult<()> {
        self.events.lock().unwrap().retain(|e| e.id != event_id);
        self.deleted.lock().unwrap().push(event_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSink {
    events: Mutex<BTreeMap<String, SinkEvent>>,
    order: Mutex<Vec<String>>,
    rejected_titles: Mutex<HashSet<String>>,
    failing_deletes: Mutex<HashSet<String>>,
    cancel_on_create: Mutex<Option<CancellationToken>>,
    revoked: AtomicBool,
    next_id: AtomicU64,
    creates: AtomicUsize,
    deletes: AtomicUsize,
}

impl FakeSink {
    pub fn insert(&self, id: &str, title: &str) {
        self.events.lock().unwrap().insert(
            id.to_string(),
            SinkEvent {
                id: id.to_string(),
                title: title.to_string(),
                start: Utc::now(),
                end: None,
                description: None,
                location: None,
                kind: SinkEventKind::External,
            },
        );
        self.order.lock().unwrap().push(id.to_string());
    }

    pub fn reject_title(&self, title: &str) {
        self.rejected_titles.lock().unwrap().insert(title.to_string());
    }

    /// Reject every create as unauthorized.
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    /// Cancel `token` as soon as a create succeeds.
    pub fn cancel_on_create(&self, token: CancellationToken) {
        *self.cancel_on_create.lock().unwrap() = Some(token);
    }

    pub fn fail_delete(&self, id: &str) {
        self.failing_deletes.lock().unwrap().insert(id.to_string());
    }

    /// Titles of live events in creation order.
    pub fn titles(&self) -> Vec<String> {
        let events = self.events.lock().unwrap();
        self.order
            .lock()
            .unwrap()
            .iter()
            .filter_map(|id| events.get(id).map(|e| e.title.clone()))
            .collect()
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SinkEventManager for FakeSink {
    async fn list(&self) -> BridgeResult<Vec<SinkEvent>> {
        Ok(self.events.lock().unwrap().values().cloned().collect())
    }

    async fn get(&self, id: &str) -> BridgeResult<Option<SinkEvent>> {
        Ok(self.events.lock().unwrap().get(id).cloned())
    }

    async fn create(&self, spec: &SinkEventSpec) -> BridgeResult<SinkEvent> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.revoked.load(Ordering::SeqCst) {
            return Err(BridgeError::Auth("401 Unauthorized".into()));
        }
        if self.rejected_titles.lock().unwrap().contains(&spec.title) {
            return Err(BridgeError::SinkCreate(format!("rejected '{}'", spec.title)));
        }

        let id = (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        let event = SinkEvent {
            id: id.clone(),
            title: spec.title.clone(),
            start: spec.start,
            end: Some(spec.end),
            description: spec.description.clone(),
            location: Some(spec.location.clone()),
            kind: spec.kind,
        };
        self.events.lock().unwrap().insert(id.clone(), event.clone());
        self.order.lock().unwrap().push(id);
        if let Some(token) = self.cancel_on_create.lock().unwrap().as_ref() {
            token.cancel();
        }
        Ok(event)
    }

    async fn delete(&self, id: &str) -> BridgeResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.failing_deletes.lock().unwrap().contains(id) {
            return Err(BridgeError::Sink("503 Service Unavailable".into()));
        }
        self.events.lock().unwrap().remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryLinks {
    rows: Mutex<Vec<LinkRecord>>,
    fail_creates: AtomicBool,
}

impl MemoryLinks {
    pub fn insert(&self, source_id: &str, sink_id: &str) {
        self.rows
            .lock()
            .unwrap()
            .push(LinkRecord::new(source_id, sink_id));
    }

    pub fn fail_creates(&self) {
        self.fail_creates.store(true, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<LinkRecord> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl LinkStore for MemoryLinks {
    async fn list_all(&self) -> BridgeResult<Vec<LinkRecord>> {
        Ok(self.rows())
    }

    async fn find_by_sink_id(&self, sink_id: &str) -> BridgeResult<Option<LinkRecord>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.sink_id == sink_id)
            .cloned())
    }

    async fn create(&self, source_id: &str, sink_id: &str) -> BridgeResult<LinkRecord> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(BridgeError::Link("database is locked".into()));
        }

        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|l| l.source_id == source_id || l.sink_id == sink_id)
        {
            return Err(BridgeError::DuplicateLink {
                source_id: source_id.to_string(),
                sink_id: sink_id.to_string(),
            });
        }

        let link = LinkRecord::new(source_id, sink_id);
        rows.push(link.clone());
        Ok(link)
    }

    async fn delete_by_source_id(&self, source_id: &str) -> BridgeResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|l| l.source_id != source_id);
        Ok(rows.len() != before)
    }

    async fn delete_by_sink_id(&self, sink_id: &str) -> BridgeResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|l| l.sink_id != sink_id);
        Ok(rows.len() != before)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}
