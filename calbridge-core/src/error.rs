//! Error types for calbridge.

use thiserror::Error;

/// Errors that can occur while mirroring calendar events.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid or revoked credentials. Never retried.
    #[error("Authorization error: {0}")]
    Auth(String),

    #[error("Calendar error: {0}")]
    Source(String),

    #[error("Scheduled event error: {0}")]
    Sink(String),

    /// The sink refused to create an event (invalid fields or API rejection).
    #[error("Could not create scheduled event: {0}")]
    SinkCreate(String),

    #[error("Link store error: {0}")]
    Link(String),

    #[error("Link already exists for source '{source_id}' / sink '{sink_id}'")]
    DuplicateLink { source_id: String, sink_id: String },

    #[error("Sync pass cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Fatal errors stop the periodic trigger instead of waiting for the next tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::Auth(_) | BridgeError::Config(_))
    }
}

/// Result type alias for calbridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
