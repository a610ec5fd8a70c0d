use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Source event has no sink event yet
    Create,
    /// Source event is gone; its sink event and link go too
    Remove,
    /// Sink event is gone while the source event remains
    Orphan,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Create => write!(f, "+"),
            ActionKind::Remove => write!(f, "-"),
            ActionKind::Orphan => write!(f, "!"),
        }
    }
}
