//! Discord side of calbridge.
//!
//! Guild scheduled events are the sink; a channel webhook receives
//! incident notifications.

mod client;
mod scheduled_events;
mod types;
mod webhook;

pub use client::DiscordClient;
pub use scheduled_events::DiscordScheduledEvents;
pub use webhook::WebhookNotifier;
