use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, Utc};

use crate::event::SourceEvent;
use crate::link::LinkRecord;

/// The disjoint sets of work for one pass, computed up front.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub window_end: DateTime<Utc>,
    /// Links whose source event left the feed (deleted, cancelled, or past the horizon)
    pub to_remove: Vec<LinkRecord>,
    /// Links whose source event remains but whose sink event was deleted
    pub orphaned: Vec<LinkRecord>,
    /// Source events without a live link, in source order
    pub to_create: Vec<SourceEvent>,
}

impl SyncPlan {
    /// Compute the plan from the three views of the world.
    ///
    /// `source_events` is filtered to the window again here, since the
    /// calendar's own cap is advisory. Duplicate source ids keep the first
    /// occurrence.
    pub fn compute(
        window_end: DateTime<Utc>,
        all_day_offset: FixedOffset,
        source_events: Vec<SourceEvent>,
        links: Vec<LinkRecord>,
        sink_ids: &HashSet<String>,
    ) -> Self {
        let mut seen = HashSet::new();
        let source_events: Vec<SourceEvent> = source_events
            .into_iter()
            .filter(|e| e.starts_before(window_end, all_day_offset))
            .filter(|e| seen.insert(e.id.clone()))
            .collect();

        let source_ids: HashSet<&str> = source_events.iter().map(|e| e.id.as_str()).collect();

        let mut to_remove = Vec::new();
        let mut orphaned = Vec::new();
        let mut linked: HashSet<String> = HashSet::new();

        for link in links {
            if !source_ids.contains(link.source_id.as_str()) {
                to_remove.push(link);
            } else if !sink_ids.contains(&link.sink_id) {
                orphaned.push(link);
            } else {
                linked.insert(link.source_id.clone());
            }
        }

        let to_create = source_events
            .into_iter()
            .filter(|e| !linked.contains(&e.id))
            .collect();

        SyncPlan {
            window_end,
            to_remove,
            orphaned,
            to_create,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.orphaned.is_empty() && self.to_create.is_empty()
    }
}
