//! Colored terminal rendering for plans and pass results.

use calbridge_core::plan::{ActionKind, SyncPlan};
use calbridge_core::{EventTime, LinkRecord, PassSummary, SourceEvent};
use owo_colors::OwoColorize;

/// Show counts instead of individual items above this many
const COMPACT_THRESHOLD: usize = 5;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for ActionKind {
    fn render(&self) -> String {
        let symbol = self.to_string();
        match self {
            ActionKind::Create => symbol.green().to_string(),
            ActionKind::Remove => symbol.red().to_string(),
            ActionKind::Orphan => symbol.yellow().to_string(),
        }
    }
}

impl Render for LinkRecord {
    fn render(&self) -> String {
        format!("{} {} {}", self.source_id, "→".dimmed(), self.sink_id)
    }
}

fn render_event(event: &SourceEvent) -> String {
    let start = match &event.start {
        EventTime::DateTime(dt) => dt.format("%Y-%m-%d %H:%M UTC").to_string(),
        EventTime::Date(d) => format!("{} (all day)", d),
    };
    format!(
        "{} {} {}",
        ActionKind::Create.render(),
        event.title.green(),
        start.dimmed()
    )
}

fn render_links(
    kind: ActionKind,
    links: &[LinkRecord],
    label: &str,
    verbose: bool,
    lines: &mut Vec<String>,
) {
    if links.is_empty() {
        return;
    }
    if verbose || links.len() <= COMPACT_THRESHOLD {
        for link in links {
            lines.push(format!("   {} {}", kind.render(), link.render()));
        }
    } else {
        lines.push(format!("   {} ({} {})", kind.render(), links.len(), label));
    }
}

pub trait PlanRender {
    fn render(&self, verbose: bool) -> String;
}

impl PlanRender for SyncPlan {
    fn render(&self, verbose: bool) -> String {
        if self.is_empty() {
            return "   No changes".dimmed().to_string();
        }

        let mut lines = Vec::new();

        if verbose || self.to_create.len() <= COMPACT_THRESHOLD {
            for event in &self.to_create {
                lines.push(format!("   {}", render_event(event)));
            }
        } else if !self.to_create.is_empty() {
            let label = format!("({} new events)", self.to_create.len());
            lines.push(format!("   {} {}", ActionKind::Create.render(), label.green()));
        }

        render_links(
            ActionKind::Remove,
            &self.to_remove,
            "events to remove",
            verbose,
            &mut lines,
        );

        render_links(
            ActionKind::Orphan,
            &self.orphaned,
            "events to re-create",
            verbose,
            &mut lines,
        );

        lines.join("\n")
    }
}

impl Render for PassSummary {
    fn render(&self) -> String {
        let mut line = format!(
            "Synced: {} created, {} removed, {} re-created",
            self.created, self.removed, self.relinked
        );
        if !self.failures.is_empty() {
            line.push_str(&format!(", {}", format!("{} failed", self.failures.len()).red()));
        }
        line
    }
}
