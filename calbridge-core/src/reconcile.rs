//! The sync pass: fetch, diff, apply.
//!
//! A pass keeps no state of its own between runs; everything it needs to
//! resume lives in the [`LinkStore`]. Overlapping passes are not guarded
//! here and must be serialized by the caller.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{BridgeError, BridgeResult};
use crate::event::{SinkEventSpec, SourceEvent};
use crate::link::{LinkRecord, LinkStore};
use crate::notify::{Notice, Notifier};
use crate::plan::{ActionKind, SyncPlan};
use crate::sink::SinkEventManager;
use crate::source::SourceEventFetcher;

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Forward window; events starting at or after `now + horizon` are ignored
    pub horizon: Duration,
    /// Offset used to place date-only (all-day) events
    pub all_day_offset: FixedOffset,
    pub mirror_deletes_upstream: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFailure {
    pub kind: ActionKind,
    pub source_id: String,
    pub sink_id: Option<String>,
    pub error: String,
}

/// Outcome of one applied pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassSummary {
    pub created: usize,
    pub removed: usize,
    /// Orphaned links dropped so their events could be re-created
    pub relinked: usize,
    pub failures: Vec<ItemFailure>,
}

impl PassSummary {
    pub fn is_noop(&self) -> bool {
        self.created == 0
            && self.removed == 0
            && self.relinked == 0
            && self.failures.is_empty()
    }
}

pub struct Reconciler {
    source: Arc<dyn SourceEventFetcher>,
    sink: Arc<dyn SinkEventManager>,
    links: Arc<dyn LinkStore>,
    notifier: Arc<dyn Notifier>,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn SourceEventFetcher>,
        sink: Arc<dyn SinkEventManager>,
        links: Arc<dyn LinkStore>,
        notifier: Arc<dyn Notifier>,
        config: ReconcilerConfig,
    ) -> Self {
        Reconciler {
            source,
            sink,
            links,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Compute what a pass started at `now` would do, without applying it.
    pub async fn plan_at(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> BridgeResult<SyncPlan> {
        let window_end = now + self.config.horizon;

        let source_events = guarded(cancel, self.source.list_upcoming(window_end)).await?;
        let links = guarded(cancel, self.links.list_all()).await?;
        let sink_ids: HashSet<String> = guarded(cancel, self.sink.list())
            .await?
            .into_iter()
            .map(|e| e.id)
            .collect();

        debug!(
            source_events = source_events.len(),
            links = links.len(),
            sink_events = sink_ids.len(),
            "Loaded sync state"
        );

        Ok(SyncPlan::compute(
            window_end,
            self.config.all_day_offset,
            source_events,
            links,
            &sink_ids,
        ))
    }

    pub async fn run(&self, cancel: &CancellationToken) -> BridgeResult<PassSummary> {
        self.run_at(Utc::now(), cancel).await
    }

    /// Run one pass that stops on `shutdown` or once `timeout` elapses.
    ///
    /// Both end the pass with `Cancelled`; only the timeout is reported.
    pub async fn run_with_deadline(
        &self,
        timeout: StdDuration,
        shutdown: &CancellationToken,
    ) -> BridgeResult<PassSummary> {
        let cancel = shutdown.child_token();

        match tokio::time::timeout(timeout, self.run(&cancel)).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                error!(timeout = ?timeout, "Sync pass timed out");
                self.notifier
                    .notify(&Notice::failure(
                        "Sync pass timed out",
                        format!("no result after {:?}", timeout),
                    ))
                    .await;
                Err(BridgeError::Cancelled)
            }
        }
    }

    /// Run one full pass as if started at `now`.
    ///
    /// Failures while loading state abort the pass and are reported once.
    /// Failures of individual items are reported and collected in the
    /// summary, except `Auth` and `Config` errors, which abort the pass.
    pub async fn run_at(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> BridgeResult<PassSummary> {
        let plan = match self.plan_at(now, cancel).await {
            Ok(plan) => plan,
            Err(BridgeError::Cancelled) => return Err(BridgeError::Cancelled),
            Err(e) => return self.abort(e).await,
        };

        self.apply(&plan, cancel).await
    }

    /// Apply a computed plan: removals, then orphans, then creates.
    ///
    /// Item failures are isolated, except fatal ones, which abort the rest
    /// of the pass.
    pub async fn apply(
        &self,
        plan: &SyncPlan,
        cancel: &CancellationToken,
    ) -> BridgeResult<PassSummary> {
        let mut summary = PassSummary::default();
        // Source ids whose stale link could not be dropped; creating them now
        // would produce a second sink event for the same source event.
        let mut blocked: HashSet<&str> = HashSet::new();

        for link in &plan.to_remove {
            match self.remove_linked(link, cancel).await {
                Ok(()) => summary.removed += 1,
                Err(BridgeError::Cancelled) => return self.cancelled(&summary),
                Err(e) if e.is_fatal() => return self.abort(e).await,
                Err(e) => {
                    self.record_failure(&mut summary, ActionKind::Remove, link, e)
                        .await
                }
            }
        }

        // The calendar stays authoritative here. Deleting upstream happens
        // only through `handle_sink_deleted`.
        for link in &plan.orphaned {
            let result = guarded(cancel, self.links.delete_by_source_id(&link.source_id)).await;

            match result {
                Ok(_) => summary.relinked += 1,
                Err(BridgeError::Cancelled) => return self.cancelled(&summary),
                Err(e) if e.is_fatal() => return self.abort(e).await,
                Err(e) => {
                    blocked.insert(link.source_id.as_str());
                    self.record_failure(&mut summary, ActionKind::Orphan, link, e)
                        .await
                }
            }
        }

        for event in &plan.to_create {
            if blocked.contains(event.id.as_str()) {
                continue;
            }

            match self.create_linked(event, cancel).await {
                Ok(link) => {
                    debug!(source_id = %link.source_id, sink_id = %link.sink_id, "Created scheduled event");
                    summary.created += 1;
                }
                Err(BridgeError::Cancelled) => return self.cancelled(&summary),
                Err(e) if e.is_fatal() => return self.abort(e).await,
                Err(e) => {
                    self.record_failure(&mut summary, ActionKind::Create, event, e)
                        .await
                }
            }
        }

        info!(
            created = summary.created,
            removed = summary.removed,
            relinked = summary.relinked,
            failed = summary.failures.len(),
            "Sync pass finished"
        );

        Ok(summary)
    }

    /// Mirror a deletion made directly in the sink back to the calendar.
    ///
    /// Returns the link that was resolved, or `None` when mirroring is off,
    /// the sink event is unknown, or it still exists.
    pub async fn handle_sink_deleted(&self, sink_id: &str) -> BridgeResult<Option<LinkRecord>> {
        if !self.config.mirror_deletes_upstream {
            debug!(sink_id, "Ignoring sink deletion, upstream mirroring is off");
            return Ok(None);
        }

        let Some(link) = self.links.find_by_sink_id(sink_id).await? else {
            debug!(sink_id, "Deleted scheduled event was not linked");
            return Ok(None);
        };

        if self.sink.get(sink_id).await?.is_some() {
            warn!(sink_id, "Scheduled event still exists, not deleting calendar event");
            return Ok(None);
        }

        self.source.delete_event(&link.source_id).await?;
        self.links.delete_by_sink_id(sink_id).await?;

        info!(source_id = %link.source_id, sink_id, "Mirrored scheduled event deletion to calendar");
        self.notifier
            .notify(&Notice::info(format!(
                "Deleted calendar event {} because scheduled event {} was removed",
                link.source_id, sink_id
            )))
            .await;

        Ok(Some(link))
    }

    /// The link write is not cancellable once the sink delete went through.
    async fn remove_linked(&self, link: &LinkRecord, cancel: &CancellationToken) -> BridgeResult<()> {
        guarded(cancel, self.sink.delete(&link.sink_id)).await?;
        self.links.delete_by_source_id(&link.source_id).await?;
        debug!(source_id = %link.source_id, sink_id = %link.sink_id, "Removed scheduled event");
        Ok(())
    }

    async fn create_linked(
        &self,
        event: &SourceEvent,
        cancel: &CancellationToken,
    ) -> BridgeResult<LinkRecord> {
        let spec = SinkEventSpec::from_source(event, self.config.all_day_offset);
        spec.validate()?;

        let created = guarded(cancel, self.sink.create(&spec)).await?;

        // Not cancellable once the sink event exists. No rollback: the sink
        // event stays even if the link write fails.
        self.links
            .create(&event.id, &created.id)
            .await
            .inspect_err(|e| {
                warn!(
                    source_id = %event.id,
                    sink_id = %created.id,
                    "Scheduled event created but link not saved: {}", e
                )
            })
    }

    async fn record_failure<T: Serialize + ItemIds>(
        &self,
        summary: &mut PassSummary,
        kind: ActionKind,
        item: &T,
        e: BridgeError,
    ) {
        let (source_id, sink_id) = item.ids();

        if let BridgeError::DuplicateLink { .. } = e {
            error!(source_id, "Link invariant violated: {}", e);
        } else {
            warn!(source_id, sink_id, "{} {} failed: {}", kind, source_id, e);
        }

        let headline = match kind {
            ActionKind::Create => format!("Could not mirror calendar event {}", source_id),
            ActionKind::Remove => format!("Could not remove scheduled event for {}", source_id),
            ActionKind::Orphan => format!("Could not resolve orphaned link for {}", source_id),
        };
        self.notifier
            .notify(&Notice::failure(headline, &e).with_item(item))
            .await;

        summary.failures.push(ItemFailure {
            kind,
            source_id: source_id.to_string(),
            sink_id: sink_id.map(str::to_string),
            error: e.to_string(),
        });
    }

    async fn abort(&self, e: BridgeError) -> BridgeResult<PassSummary> {
        error!("Sync pass aborted: {}", e);
        self.notifier
            .notify(&Notice::failure("Sync pass aborted", &e))
            .await;
        Err(e)
    }

    fn cancelled(&self, summary: &PassSummary) -> BridgeResult<PassSummary> {
        warn!(
            created = summary.created,
            removed = summary.removed,
            "Sync pass cancelled, applied changes are kept"
        );
        Err(BridgeError::Cancelled)
    }
}

/// Ids identifying a work item in logs and failure reports.
trait ItemIds {
    fn ids(&self) -> (&str, Option<&str>);
}

impl ItemIds for LinkRecord {
    fn ids(&self) -> (&str, Option<&str>) {
        (&self.source_id, Some(&self.sink_id))
    }
}

impl ItemIds for SourceEvent {
    fn ids(&self) -> (&str, Option<&str>) {
        (&self.id, None)
    }
}

async fn guarded<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = BridgeResult<T>>,
) -> BridgeResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BridgeError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCalendar, FakeSink, MemoryLinks, RecordingNotifier, event_at};
    use chrono::TimeZone;

    struct Harness {
        calendar: Arc<FakeCalendar>,
        sink: Arc<FakeSink>,
        links: Arc<MemoryLinks>,
        notifier: Arc<RecordingNotifier>,
        reconciler: Reconciler,
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn harness(horizon_days: i64, mirror: bool) -> Harness {
        let calendar = Arc::new(FakeCalendar::default());
        let sink = Arc::new(FakeSink::default());
        let links = Arc::new(MemoryLinks::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let reconciler = Reconciler::new(
            calendar.clone(),
            sink.clone(),
            links.clone(),
            notifier.clone(),
            ReconcilerConfig {
                horizon: Duration::days(horizon_days),
                all_day_offset: FixedOffset::west_opt(5 * 3600).unwrap(),
                mirror_deletes_upstream: mirror,
            },
        );

        Harness {
            calendar,
            sink,
            links,
            notifier,
            reconciler,
        }
    }

    async fn pass(h: &Harness) -> PassSummary {
        h.reconciler
            .run_at(now(), &CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_creates_only_events_inside_horizon_then_settles() {
        let h = harness(30, false);
        h.calendar.set(vec![
            event_at("A", now() + Duration::days(5)),
            event_at("B", now() + Duration::days(40)),
        ]);

        let first = pass(&h).await;
        assert_eq!(first.created, 1);

        let links = h.links.rows();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].source_id, "A");
        assert_eq!(h.sink.titles(), vec!["Event A".to_string()]);

        let second = pass(&h).await;
        assert!(second.is_noop());
        assert_eq!(h.sink.create_calls(), 1);
        assert_eq!(h.sink.delete_calls(), 0);
    }

    #[tokio::test]
    async fn test_removes_sink_event_when_source_disappears() {
        let h = harness(30, false);
        h.sink.insert("X", "Old event");
        h.links.insert("A", "X");

        let summary = pass(&h).await;

        assert_eq!(summary.removed, 1);
        assert!(h.links.rows().is_empty());
        assert!(h.sink.titles().is_empty());
        assert_eq!(h.sink.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_removal_tolerates_already_deleted_sink_event() {
        let h = harness(30, false);
        h.links.insert("A", "X");

        let summary = pass(&h).await;

        assert_eq!(summary.removed, 1);
        assert!(summary.failures.is_empty());
        assert!(h.links.rows().is_empty());
    }

    #[tokio::test]
    async fn test_failed_sink_delete_keeps_link_for_next_pass() {
        let h = harness(30, false);
        h.sink.insert("X", "Old event");
        h.sink.fail_delete("X");
        h.links.insert("A", "X");

        let summary = pass(&h).await;

        assert_eq!(summary.removed, 0);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].kind, ActionKind::Remove);
        assert_eq!(h.links.rows(), vec![LinkRecord::new("A", "X")]);
    }

    #[tokio::test]
    async fn test_one_failed_create_does_not_block_the_rest() {
        let h = harness(30, false);
        h.calendar.set(vec![
            event_at("1", now() + Duration::days(1)),
            event_at("2", now() + Duration::days(2)),
            event_at("3", now() + Duration::days(3)),
        ]);
        h.sink.reject_title("Event 2");

        let summary = pass(&h).await;

        assert_eq!(summary.created, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].source_id, "2");

        let linked: Vec<String> = h.links.rows().into_iter().map(|l| l.source_id).collect();
        assert_eq!(linked, vec!["1".to_string(), "3".to_string()]);

        let notices = h.notifier.notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].context.as_deref().unwrap().contains("\"id\": \"2\""));
    }

    #[tokio::test]
    async fn test_creates_follow_source_order() {
        let h = harness(30, false);
        h.calendar.set(vec![
            event_at("early", now() + Duration::days(1)),
            event_at("late", now() + Duration::days(9)),
        ]);

        pass(&h).await;

        assert_eq!(
            h.sink.titles(),
            vec!["Event early".to_string(), "Event late".to_string()]
        );
    }

    #[tokio::test]
    async fn test_horizon_boundary() {
        let h = harness(30, false);
        let window_end = now() + Duration::days(30);
        h.calendar.set(vec![
            event_at("inside", window_end - Duration::seconds(1)),
            event_at("boundary", window_end),
        ]);

        let summary = pass(&h).await;

        assert_eq!(summary.created, 1);
        assert_eq!(h.links.rows()[0].source_id, "inside");
        assert_eq!(h.calendar.last_window_end(), Some(window_end));
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_pass_and_reports_once() {
        let h = harness(30, false);
        h.links.insert("A", "X");
        h.sink.insert("X", "Old event");
        h.calendar.fail_fetch();

        let result = h.reconciler.run_at(now(), &CancellationToken::new()).await;

        assert!(matches!(result, Err(BridgeError::Source(_))));
        assert_eq!(h.notifier.notices().len(), 1);
        assert_eq!(h.links.rows().len(), 1);
        assert_eq!(h.sink.delete_calls(), 0);
    }

    #[tokio::test]
    async fn test_orphaned_link_is_recreated_without_mirroring() {
        let h = harness(30, false);
        h.calendar.set(vec![event_at("A", now() + Duration::days(1))]);
        h.links.insert("A", "X");

        let summary = pass(&h).await;

        assert_eq!(summary.relinked, 1);
        assert_eq!(summary.created, 1);
        let links = h.links.rows();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].source_id, "A");
        assert_ne!(links[0].sink_id, "X");
        assert!(h.calendar.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_orphaned_link_never_deletes_upstream_in_a_pass() {
        let h = harness(30, true);
        h.calendar.set(vec![event_at("A", now() + Duration::days(1))]);
        h.links.insert("A", "X");

        let summary = pass(&h).await;

        assert!(h.calendar.deleted().is_empty());
        assert_eq!(summary.relinked, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(h.sink.titles(), vec!["Event A".to_string()]);
        assert_eq!(h.links.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_pass_after_first_attempt() {
        let h = harness(30, false);
        h.calendar.set(vec![
            event_at("A", now() + Duration::days(1)),
            event_at("B", now() + Duration::days(2)),
            event_at("C", now() + Duration::days(3)),
        ]);
        h.sink.revoke();

        let result = h.reconciler.run_at(now(), &CancellationToken::new()).await;

        assert!(matches!(result, Err(BridgeError::Auth(_))));
        assert_eq!(h.sink.create_calls(), 1);
        let notices = h.notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].headline, "Sync pass aborted");
        assert!(h.links.rows().is_empty());
    }

    #[tokio::test]
    async fn test_link_write_failure_is_reported_without_rollback() {
        let h = harness(30, false);
        h.calendar.set(vec![event_at("A", now() + Duration::days(1))]);
        h.links.fail_creates();

        let summary = pass(&h).await;

        assert_eq!(summary.created, 0);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(h.sink.titles(), vec!["Event A".to_string()]);
        assert!(h.links.rows().is_empty());
    }

    #[tokio::test]
    async fn test_links_stay_a_bijection_across_passes() {
        let h = harness(30, false);
        h.calendar.set(vec![
            event_at("A", now() + Duration::days(1)),
            event_at("B", now() + Duration::days(2)),
        ]);
        pass(&h).await;

        h.calendar.set(vec![
            event_at("B", now() + Duration::days(2)),
            event_at("C", now() + Duration::days(3)),
        ]);
        pass(&h).await;
        pass(&h).await;

        let links = h.links.rows();
        let sources: HashSet<&str> = links.iter().map(|l| l.source_id.as_str()).collect();
        let sinks: HashSet<&str> = links.iter().map(|l| l.sink_id.as_str()).collect();
        assert_eq!(links.len(), 2);
        assert_eq!(sources.len(), links.len());
        assert_eq!(sinks.len(), links.len());
        assert_eq!(h.sink.titles().len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_pass_applies_nothing() {
        let h = harness(30, false);
        h.calendar.set(vec![event_at("A", now() + Duration::days(1))]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = h.reconciler.run_at(now(), &cancel).await;

        assert!(matches!(result, Err(BridgeError::Cancelled)));
        assert_eq!(h.sink.create_calls(), 0);
        assert!(h.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_pass_keeps_applied_items() {
        let h = harness(30, false);
        h.calendar.set(vec![
            event_at("A", now() + Duration::days(1)),
            event_at("B", now() + Duration::days(2)),
            event_at("C", now() + Duration::days(3)),
        ]);
        let cancel = CancellationToken::new();
        h.sink.cancel_on_create(cancel.clone());

        let result = h.reconciler.run_at(now(), &cancel).await;

        assert!(matches!(result, Err(BridgeError::Cancelled)));
        assert_eq!(h.sink.create_calls(), 1);
        assert_eq!(h.sink.titles(), vec!["Event A".to_string()]);
        assert_eq!(h.links.rows(), vec![LinkRecord::new("A", "1")]);
        assert!(h.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_deadline_expiry_is_reported() {
        let h = harness(30, false);
        h.calendar.hang_fetch();

        let result = h
            .reconciler
            .run_with_deadline(StdDuration::from_millis(50), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(BridgeError::Cancelled)));
        let notices = h.notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].headline, "Sync pass timed out");
    }

    #[tokio::test]
    async fn test_shutdown_is_not_reported() {
        let h = harness(30, false);
        h.calendar.hang_fetch();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let result = h
            .reconciler
            .run_with_deadline(StdDuration::from_secs(60), &shutdown)
            .await;

        assert!(matches!(result, Err(BridgeError::Cancelled)));
        assert!(h.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_sink_deletion_is_mirrored_when_enabled() {
        let h = harness(30, true);
        h.links.insert("A", "X");

        let link = h.reconciler.handle_sink_deleted("X").await.unwrap();

        assert_eq!(link, Some(LinkRecord::new("A", "X")));
        assert_eq!(h.calendar.deleted(), vec!["A".to_string()]);
        assert!(h.links.rows().is_empty());
        assert_eq!(h.notifier.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_sink_deletion_ignored_when_disabled() {
        let h = harness(30, false);
        h.links.insert("A", "X");

        let link = h.reconciler.handle_sink_deleted("X").await.unwrap();

        assert_eq!(link, None);
        assert!(h.calendar.deleted().is_empty());
        assert_eq!(h.links.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_sink_deletion_requires_event_to_be_gone() {
        let h = harness(30, true);
        h.links.insert("A", "X");
        h.sink.insert("X", "Still here");

        let link = h.reconciler.handle_sink_deleted("X").await.unwrap();

        assert_eq!(link, None);
        assert!(h.calendar.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_plan_does_not_mutate() {
        let h = harness(30, false);
        h.calendar.set(vec![event_at("A", now() + Duration::days(1))]);
        h.links.insert("gone", "X");

        let plan = h
            .reconciler
            .plan_at(now(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(plan.to_create.len(), 1);
        assert_eq!(plan.to_remove.len(), 1);
        assert_eq!(h.sink.create_calls(), 0);
        assert_eq!(h.links.rows().len(), 1);
    }
}
