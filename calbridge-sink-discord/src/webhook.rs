//! Incident notifications posted to a Discord channel webhook.

use async_trait::async_trait;
use calbridge_core::notify::{Notice, Notifier};
use calbridge_core::truncate_chars;
use serde_json::json;
use tracing::warn;

/// Discord rejects messages longer than this.
const MAX_MESSAGE_CHARS: usize = 2000;

pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Self {
        WebhookNotifier {
            http: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notice: &Notice) {
        let content = render(notice);

        let result = self
            .http
            .post(&self.url)
            .json(&json!({ "content": content }))
            .send()
            .await
            .and_then(|r| r.error_for_status());

        if let Err(e) = result {
            warn!("Failed to deliver webhook notification: {}", e);
        }
    }
}

/// Format a notice as a Discord message, shrinking the context block to fit.
pub(crate) fn render(notice: &Notice) -> String {
    let mut head = format!("**{}**", notice.headline);
    if let Some(error) = &notice.error {
        head.push_str(&format!("\n```{}```", error));
    }

    let Some(context) = &notice.context else {
        return truncate_chars(&head, MAX_MESSAGE_CHARS);
    };

    // "\n```" + "```"
    let overhead = 7;
    let room = MAX_MESSAGE_CHARS.saturating_sub(head.chars().count() + overhead);
    if room == 0 {
        return truncate_chars(&head, MAX_MESSAGE_CHARS);
    }

    format!("{}\n```{}```", head, truncate_chars(context, room))
}
