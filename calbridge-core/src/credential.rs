//! OAuth credential record shared by the calendar session and its storage.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BridgeResult;

/// Refresh this long before the access token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(EXPIRY_MARGIN_SECS) >= expires_at,
            None => self.access_token.is_empty(),
        }
    }
}

/// Single-record key-value store for the credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> BridgeResult<Option<TokenRecord>>;

    async fn save(&self, record: &TokenRecord) -> BridgeResult<()>;
}
