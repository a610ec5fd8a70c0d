//! Thin authenticated client for the Discord REST API.

use calbridge_core::{BridgeError, BridgeResult};
use reqwest::{Method, RequestBuilder, Response, StatusCode};

const API_BASE: &str = "https://discord.com/api/v10";

#[derive(Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    bot_token: String,
    base_url: String,
}

impl DiscordClient {
    pub fn new(bot_token: &str) -> Self {
        Self::with_base_url(bot_token, API_BASE)
    }

    pub fn with_base_url(bot_token: &str, base_url: &str) -> Self {
        DiscordClient {
            http: reqwest::Client::new(),
            bot_token: bot_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bot {}", self.bot_token))
            .header(
                "User-Agent",
                format!(
                    "DiscordBot (https://github.com/calbridge/calbridge, {})",
                    env!("CARGO_PKG_VERSION")
                ),
            )
    }

    pub(crate) async fn send(&self, request: RequestBuilder, what: &str) -> BridgeResult<Response> {
        request
            .send()
            .await
            .map_err(|e| BridgeError::Sink(format!("{what}: {e}")))
    }
}

/// Map a non-success response to an error, reading the body for context.
pub(crate) async fn error_for(response: Response, what: &str) -> BridgeError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    status_error(status, what, &body)
}

pub(crate) fn status_error(status: StatusCode, what: &str, body: &str) -> BridgeError {
    let message = format!("{what}: {status} {body}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BridgeError::Auth(message),
        _ => BridgeError::Sink(message),
    }
}
