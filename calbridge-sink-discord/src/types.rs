//! Discord REST wire types for guild scheduled events.

use calbridge_core::{Privacy, SinkEvent, SinkEventKind, SinkEventSpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const ENTITY_TYPE_STAGE_INSTANCE: u8 = 1;
const ENTITY_TYPE_VOICE: u8 = 2;
const ENTITY_TYPE_EXTERNAL: u8 = 3;

const PRIVACY_LEVEL_GUILD_ONLY: u8 = 2;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildScheduledEvent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scheduled_start_time: DateTime<Utc>,
    #[serde(default)]
    pub scheduled_end_time: Option<DateTime<Utc>>,
    pub entity_type: u8,
    #[serde(default)]
    pub entity_metadata: Option<EntityMetadata>,
}

impl From<GuildScheduledEvent> for SinkEvent {
    fn from(event: GuildScheduledEvent) -> Self {
        let kind = match event.entity_type {
            ENTITY_TYPE_STAGE_INSTANCE => SinkEventKind::StageInstance,
            ENTITY_TYPE_VOICE => SinkEventKind::Voice,
            _ => SinkEventKind::External,
        };

        SinkEvent {
            id: event.id,
            title: event.name,
            start: event.scheduled_start_time,
            end: event.scheduled_end_time,
            description: event.description,
            location: event.entity_metadata.and_then(|m| m.location),
            kind,
        }
    }
}

/// Body of `POST /guilds/{guild.id}/scheduled-events`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateScheduledEvent {
    pub name: String,
    pub privacy_level: u8,
    pub scheduled_start_time: DateTime<Utc>,
    pub scheduled_end_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub entity_type: u8,
    pub entity_metadata: EntityMetadata,
}

impl From<&SinkEventSpec> for CreateScheduledEvent {
    fn from(spec: &SinkEventSpec) -> Self {
        let entity_type = match spec.kind {
            SinkEventKind::StageInstance => ENTITY_TYPE_STAGE_INSTANCE,
            SinkEventKind::Voice => ENTITY_TYPE_VOICE,
            SinkEventKind::External => ENTITY_TYPE_EXTERNAL,
        };
        let privacy_level = match spec.privacy {
            Privacy::GuildOnly => PRIVACY_LEVEL_GUILD_ONLY,
        };

        CreateScheduledEvent {
            name: spec.title.clone(),
            privacy_level,
            scheduled_start_time: spec.start,
            scheduled_end_time: spec.end,
            description: spec.description.clone(),
            entity_type,
            entity_metadata: EntityMetadata {
                location: Some(spec.location.clone()),
            },
        }
    }
}
