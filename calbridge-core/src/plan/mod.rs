//! Diff computation between the calendar, the sink, and the link table.

mod action_kind;
mod sync_plan;

pub use action_kind::ActionKind;
pub use sync_plan::SyncPlan;
