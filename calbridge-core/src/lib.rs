//! Core types and the reconciliation engine for calbridge.
//!
//! This crate knows nothing about Google or Discord. It provides:
//! - the provider-neutral event model (`event`)
//! - the collaborator traits the engine talks to (`source`, `sink`, `link`,
//!   `credential`, `notify`)
//! - the diff (`plan`) and the pass that applies it (`reconcile`)

pub mod credential;
pub mod error;
pub mod event;
pub mod link;
pub mod notify;
pub mod plan;
pub mod reconcile;
pub mod sink;
pub mod source;

#[cfg(test)]
mod testing;

pub use error::{BridgeError, BridgeResult};
pub use event::*;
pub use link::{LinkRecord, LinkStore};
pub use reconcile::{ItemFailure, PassSummary, Reconciler, ReconcilerConfig};
