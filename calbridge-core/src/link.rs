//! Persisted bijection between source event ids and sink event ids.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BridgeResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source_id: String,
    pub sink_id: String,
}

impl LinkRecord {
    pub fn new(source_id: impl Into<String>, sink_id: impl Into<String>) -> Self {
        LinkRecord {
            source_id: source_id.into(),
            sink_id: sink_id.into(),
        }
    }
}

/// Storage for [`LinkRecord`]s.
///
/// At most one record exists per `source_id` and per `sink_id`. Every
/// mutation touches a single row.
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn list_all(&self) -> BridgeResult<Vec<LinkRecord>>;

    async fn find_by_sink_id(&self, sink_id: &str) -> BridgeResult<Option<LinkRecord>>;

    /// Fails with `BridgeError::DuplicateLink` if either id is already linked.
    async fn create(&self, source_id: &str, sink_id: &str) -> BridgeResult<LinkRecord>;

    /// Returns whether a row was removed.
    async fn delete_by_source_id(&self, source_id: &str) -> BridgeResult<bool>;

    /// Returns whether a row was removed.
    async fn delete_by_sink_id(&self, sink_id: &str) -> BridgeResult<bool>;
}
