//! Google Calendar source for calbridge.
//!
//! - [`GoogleCalendar`] implements `SourceEventFetcher` on top of the
//!   Calendar v3 API
//! - [`Session`] keeps the OAuth access token fresh, persisting the
//!   credential record through a `CredentialStore`
//! - [`authorize`] runs the one-time browser consent flow

mod authorize;
mod calendar;
mod credentials;
mod from_google;
mod session;

pub use authorize::authorize;
pub use calendar::GoogleCalendar;
pub use credentials::{DEFAULT_REDIRECT_URI, GoogleCredentials};
pub use session::Session;
