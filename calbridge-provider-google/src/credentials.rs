//! OAuth client configuration for the Google Calendar API.

use calbridge_core::{BridgeError, BridgeResult};
use url::Url;

pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar"];

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8085/callback";

/// Google OAuth client credentials (user-provided).
#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub project_id: String,
    pub redirect_uri: String,
}

impl GoogleCredentials {
    /// Address the consent callback listener binds to.
    ///
    /// Only loopback redirects can be served locally.
    pub fn redirect_address(&self) -> BridgeResult<String> {
        let url = Url::parse(&self.redirect_uri)
            .map_err(|e| BridgeError::Config(format!("Invalid redirect URL: {e}")))?;

        match url.host_str() {
            Some("localhost") | Some("127.0.0.1") => {}
            _ => {
                return Err(BridgeError::Config(format!(
                    "Redirect URL must point to localhost, got {}",
                    self.redirect_uri
                )));
            }
        }

        let port = url.port_or_known_default().unwrap_or(80);
        Ok(format!("127.0.0.1:{}", port))
    }

    pub fn redirect_path(&self) -> String {
        Url::parse(&self.redirect_uri)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| "/".to_string())
    }
}
