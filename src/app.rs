//! Builds the reconciler and its collaborators from [`Settings`].

use std::sync::Arc;

use anyhow::Result;
use calbridge_core::notify::{LogNotifier, Notifier};
use calbridge_core::Reconciler;
use calbridge_provider_google::{GoogleCalendar, Session};
use calbridge_sink_discord::{DiscordClient, DiscordScheduledEvents, WebhookNotifier};
use tracing::debug;

use crate::config::Settings;
use crate::store::SqliteStore;

pub struct App {
    pub settings: Settings,
    pub store: Arc<SqliteStore>,
    pub reconciler: Reconciler,
}

impl App {
    pub fn build(settings: Settings) -> Result<Self> {
        let store = Arc::new(SqliteStore::open(&settings.database)?);

        let session = Arc::new(Session::new(settings.google.clone(), store.clone()));
        let source = Arc::new(GoogleCalendar::new(
            session,
            &settings.calendar_id,
            settings.max_results,
        ));

        let discord = DiscordClient::new(&settings.bot_token);
        let sink = Arc::new(DiscordScheduledEvents::new(discord, &settings.guild_id));

        let notifier: Arc<dyn Notifier> = match &settings.error_webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url)),
            None => {
                debug!("No ERROR_WEBHOOK_URL configured, notices go to the log only");
                Arc::new(LogNotifier)
            }
        };

        let reconciler = Reconciler::new(
            source,
            sink,
            store.clone(),
            notifier,
            settings.reconciler.clone(),
        );

        Ok(App {
            settings,
            store,
            reconciler,
        })
    }
}
