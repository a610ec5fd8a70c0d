//! The scheduled-event side of the bridge.

use async_trait::async_trait;

use crate::error::BridgeResult;
use crate::event::{SinkEvent, SinkEventSpec};

#[async_trait]
pub trait SinkEventManager: Send + Sync {
    async fn list(&self) -> BridgeResult<Vec<SinkEvent>>;

    /// `Ok(None)` when the event does not exist (anymore).
    async fn get(&self, id: &str) -> BridgeResult<Option<SinkEvent>>;

    /// Fails with `BridgeError::SinkCreate` on invalid fields or API rejection.
    async fn create(&self, spec: &SinkEventSpec) -> BridgeResult<SinkEvent>;

    /// Idempotent: deleting an event that is already gone succeeds.
    async fn delete(&self, id: &str) -> BridgeResult<()>;
}
