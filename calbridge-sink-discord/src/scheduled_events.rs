//! Guild scheduled events as the sink.

use async_trait::async_trait;
use calbridge_core::sink::SinkEventManager;
use calbridge_core::{BridgeError, BridgeResult, SinkEvent, SinkEventSpec};
use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::client::{DiscordClient, error_for, status_error};
use crate::types::{CreateScheduledEvent, GuildScheduledEvent};

pub struct DiscordScheduledEvents {
    client: DiscordClient,
    guild_id: String,
}

impl DiscordScheduledEvents {
    pub fn new(client: DiscordClient, guild_id: &str) -> Self {
        DiscordScheduledEvents {
            client,
            guild_id: guild_id.to_string(),
        }
    }

    fn events_path(&self) -> String {
        format!("/guilds/{}/scheduled-events", self.guild_id)
    }

    fn event_path(&self, id: &str) -> String {
        format!("/guilds/{}/scheduled-events/{}", self.guild_id, id)
    }
}

#[async_trait]
impl SinkEventManager for DiscordScheduledEvents {
    async fn list(&self) -> BridgeResult<Vec<SinkEvent>> {
        let what = "Failed to list scheduled events";
        let response = self
            .client
            .send(self.client.request(Method::GET, &self.events_path()), what)
            .await?;

        if !response.status().is_success() {
            return Err(error_for(response, what).await);
        }

        let events: Vec<GuildScheduledEvent> = response
            .json()
            .await
            .map_err(|e| BridgeError::Sink(format!("{what}: {e}")))?;

        Ok(events.into_iter().map(SinkEvent::from).collect())
    }

    async fn get(&self, id: &str) -> BridgeResult<Option<SinkEvent>> {
        let what = format!("Failed to fetch scheduled event {id}");
        let response = self
            .client
            .send(self.client.request(Method::GET, &self.event_path(id)), &what)
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_for(response, &what).await);
        }

        let event: GuildScheduledEvent = response
            .json()
            .await
            .map_err(|e| BridgeError::Sink(format!("{what}: {e}")))?;

        Ok(Some(event.into()))
    }

    async fn create(&self, spec: &SinkEventSpec) -> BridgeResult<SinkEvent> {
        spec.validate()?;

        let what = format!("Failed to create scheduled event '{}'", spec.title);
        let body = CreateScheduledEvent::from(spec);
        let response = self
            .client
            .send(
                self.client
                    .request(Method::POST, &self.events_path())
                    .json(&body),
                &what,
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::BAD_REQUEST => BridgeError::SinkCreate(format!("{what}: {text}")),
                _ => status_error(status, &what, &text),
            });
        }

        let created: GuildScheduledEvent = response
            .json()
            .await
            .map_err(|e| BridgeError::Sink(format!("{what}: {e}")))?;

        debug!(sink_id = %created.id, name = %created.name, "Created guild scheduled event");

        Ok(created.into())
    }

    async fn delete(&self, id: &str) -> BridgeResult<()> {
        let what = format!("Failed to delete scheduled event {id}");
        let response = self
            .client
            .send(self.client.request(Method::DELETE, &self.event_path(id)), &what)
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!(sink_id = id, "Scheduled event already deleted");
                Ok(())
            }
            _ => Err(error_for(response, &what).await),
        }
    }
}
