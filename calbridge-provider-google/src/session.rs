//! Authenticated access to the Calendar API backed by the stored token record.

use std::sync::Arc;

use calbridge_core::credential::{CredentialStore, TokenRecord};
use calbridge_core::{BridgeError, BridgeResult};
use chrono::{Duration, Utc};
use google_calendar::{AccessToken, Client};
use tokio::sync::Mutex;
use tracing::debug;

use crate::credentials::GoogleCredentials;

pub struct Session {
    creds: GoogleCredentials,
    store: Arc<dyn CredentialStore>,
    // Serializes refreshes so two callers never race on the stored record
    refresh_lock: Mutex<()>,
}

impl Session {
    pub fn new(creds: GoogleCredentials, store: Arc<dyn CredentialStore>) -> Self {
        Session {
            creds,
            store,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn credentials(&self) -> &GoogleCredentials {
        &self.creds
    }

    /// An API client with a non-expired access token, refreshing if needed.
    pub async fn client(&self) -> BridgeResult<Client> {
        let _guard = self.refresh_lock.lock().await;

        let record = self.store.load().await?.ok_or_else(|| {
            BridgeError::Auth(
                "No Google credentials stored. Run `calbridge authorize` first.".to_string(),
            )
        })?;

        let record = if record.needs_refresh(Utc::now()) {
            debug!("Access token expired, refreshing");
            let refreshed = self.refresh(&record).await?;
            self.store.save(&refreshed).await?;
            refreshed
        } else {
            record
        };

        Ok(self.client_for(&record))
    }

    fn client_for(&self, record: &TokenRecord) -> Client {
        Client::new(
            self.creds.client_id.clone(),
            self.creds.client_secret.clone(),
            self.creds.redirect_uri.clone(),
            record.access_token.clone(),
            record.refresh_token.clone(),
        )
    }

    async fn refresh(&self, record: &TokenRecord) -> BridgeResult<TokenRecord> {
        let tokens = self
            .client_for(record)
            .refresh_access_token()
            .await
            .map_err(|e| BridgeError::Auth(format!("Failed to refresh token: {e}")))?;

        Ok(token_record(&tokens, &record.refresh_token))
    }
}

/// Convert a token response, keeping `previous_refresh` when Google omits a new one.
pub(crate) fn token_record(tokens: &AccessToken, previous_refresh: &str) -> TokenRecord {
    let expires_at = if tokens.expires_in > 0 {
        Some(Utc::now() + Duration::seconds(tokens.expires_in))
    } else {
        None
    };

    // Refresh responses usually omit the refresh token; keep the old one
    let refresh_token = if tokens.refresh_token.is_empty() {
        previous_refresh.to_string()
    } else {
        tokens.refresh_token.clone()
    };

    TokenRecord {
        access_token: tokens.access_token.clone(),
        refresh_token,
        expires_at,
    }
}
