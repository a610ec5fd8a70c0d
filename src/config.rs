//! Process configuration.
//!
//! Values come from an optional TOML file (~/.config/calbridge/config.toml)
//! overlaid by the environment (`CLIENT_ID`, `CALENDAR_ID`, ...). Everything
//! is validated up front so a bad deployment fails at startup, not mid-pass.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use calbridge_core::{BridgeError, ReconcilerConfig};
use calbridge_provider_google::{DEFAULT_REDIRECT_URI, GoogleCredentials};
use chrono::{Duration, FixedOffset, Offset, Utc};
use config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

const DEFAULT_ALL_DAY_OFFSET: &str = "-05:00";
const DEFAULT_SYNC_INTERVAL: &str = "3h";
const DEFAULT_CALL_TIMEOUT: &str = "60s";

/// Raw values as read from file and environment.
#[derive(Debug, Default, Deserialize)]
pub struct RawSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub project_id: Option<String>,
    pub calendar_id: Option<String>,
    pub bot_token: Option<String>,
    pub guild_id: Option<String>,
    pub database_url: Option<String>,
    pub sync_horizon: Option<String>,
    pub redirect_url: Option<String>,
    pub error_webhook_url: Option<String>,
    pub all_day_offset: Option<String>,
    pub max_results: Option<String>,
    pub mirror_deletes_upstream: Option<String>,
    pub sync_interval: Option<String>,
    pub call_timeout: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseLocation {
    File(PathBuf),
    Memory,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub google: GoogleCredentials,
    pub calendar_id: String,
    pub bot_token: String,
    pub guild_id: String,
    pub database: DatabaseLocation,
    pub error_webhook_url: Option<String>,
    pub max_results: Option<usize>,
    pub sync_interval: StdDuration,
    pub call_timeout: StdDuration,
    pub reconciler: ReconcilerConfig,
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Could not determine config directory")?
        .join("calbridge")
        .join("config.toml"))
}

impl Settings {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()?,
        };

        let raw: RawSettings = Config::builder()
            .add_source(File::from(path.as_path()).required(config_path.is_some()))
            .add_source(Environment::default())
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        Ok(Settings::from_raw(raw)?)
    }

    /// Validate raw values, reporting every problem at once.
    pub fn from_raw(raw: RawSettings) -> Result<Self, BridgeError> {
        let mut problems = Vec::new();

        let mut required = |key: &str, value: Option<String>| -> String {
            match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
                Some(v) => v,
                None => {
                    problems.push(format!("{} is required", key.to_uppercase()));
                    String::new()
                }
            }
        };

        let client_id = required("client_id", raw.client_id);
        let client_secret = required("client_secret", raw.client_secret);
        let project_id = required("project_id", raw.project_id);
        let calendar_id = required("calendar_id", raw.calendar_id);
        let bot_token = required("bot_token", raw.bot_token);
        let guild_id = required("guild_id", raw.guild_id);
        let database_url = required("database_url", raw.database_url);
        let sync_horizon = required("sync_horizon", raw.sync_horizon);

        if !guild_id.is_empty() && !guild_id.chars().all(|c| c.is_ascii_digit()) {
            problems.push(format!("GUILD_ID must be a numeric id, got '{}'", guild_id));
        }

        let database = match parse_database_url(&database_url) {
            Ok(db) => Some(db),
            Err(e) if !database_url.is_empty() => {
                problems.push(e);
                None
            }
            Err(_) => None,
        };

        let horizon = if sync_horizon.is_empty() {
            None
        } else {
            match parse_duration("SYNC_HORIZON", &sync_horizon)
                .and_then(|d| Duration::from_std(d).map_err(|e| format!("SYNC_HORIZON: {e}")))
            {
                Ok(d) if d > Duration::zero() => Some(d),
                Ok(_) => {
                    problems.push("SYNC_HORIZON must be longer than zero".to_string());
                    None
                }
                Err(e) => {
                    problems.push(e);
                    None
                }
            }
        };

        let redirect_uri = raw
            .redirect_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());
        match Url::parse(&redirect_uri) {
            Ok(u) if matches!(u.host_str(), Some("localhost" | "127.0.0.1")) => {}
            Ok(_) => problems.push("REDIRECT_URL must point to localhost".to_string()),
            Err(e) => problems.push(format!("REDIRECT_URL is not a valid URL: {e}")),
        }

        let error_webhook_url = raw.error_webhook_url.filter(|u| !u.trim().is_empty());
        if let Some(url) = &error_webhook_url {
            match Url::parse(url) {
                Ok(u) if u.scheme() == "https" => {}
                _ => problems.push("ERROR_WEBHOOK_URL must be an https URL".to_string()),
            }
        }

        let all_day_offset = raw
            .all_day_offset
            .unwrap_or_else(|| DEFAULT_ALL_DAY_OFFSET.to_string());
        let all_day_offset = parse_offset(&all_day_offset).unwrap_or_else(|e| {
            problems.push(e);
            Utc.fix()
        });

        let max_results = match raw.max_results.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => match s.parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    problems.push(format!("MAX_RESULTS must be a positive integer, got '{}'", s));
                    None
                }
            },
        };

        let mirror_deletes_upstream = match raw.mirror_deletes_upstream.as_deref() {
            None => false,
            Some(s) => parse_bool(s).unwrap_or_else(|| {
                problems.push(format!("MIRROR_DELETES_UPSTREAM must be true or false, got '{}'", s));
                false
            }),
        };

        let sync_interval = parse_positive_duration(
            "SYNC_INTERVAL",
            raw.sync_interval.as_deref().unwrap_or(DEFAULT_SYNC_INTERVAL),
        )
        .unwrap_or_else(|e| {
            problems.push(e);
            StdDuration::ZERO
        });

        let call_timeout = parse_positive_duration(
            "CALL_TIMEOUT",
            raw.call_timeout.as_deref().unwrap_or(DEFAULT_CALL_TIMEOUT),
        )
        .unwrap_or_else(|e| {
            problems.push(e);
            StdDuration::ZERO
        });

        if !problems.is_empty() {
            return Err(BridgeError::Config(problems.join("; ")));
        }

        let (Some(database), Some(horizon)) = (database, horizon) else {
            return Err(BridgeError::Config("incomplete configuration".to_string()));
        };

        Ok(Settings {
            google: GoogleCredentials {
                client_id,
                client_secret,
                project_id,
                redirect_uri,
            },
            calendar_id,
            bot_token,
            guild_id,
            database,
            error_webhook_url,
            max_results,
            sync_interval,
            call_timeout,
            reconciler: ReconcilerConfig {
                horizon,
                all_day_offset,
                mirror_deletes_upstream,
            },
        })
    }
}

/// Accepts `sqlite://path`, `sqlite:path`, `sqlite::memory:`, `:memory:`, or a bare path.
pub fn parse_database_url(url: &str) -> Result<DatabaseLocation, String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("DATABASE_URL is empty".to_string());
    }
    if url == ":memory:" || url == "sqlite::memory:" {
        return Ok(DatabaseLocation::Memory);
    }

    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .or_else(|| url.strip_prefix("file:"))
        .unwrap_or(url);

    if path.contains("://") {
        return Err(format!(
            "DATABASE_URL must point to a SQLite database, got '{}'",
            url
        ));
    }
    if path.is_empty() {
        return Err("DATABASE_URL has no path".to_string());
    }

    Ok(DatabaseLocation::File(PathBuf::from(path)))
}

/// Parse a `±HH:MM` offset.
pub fn parse_offset(s: &str) -> Result<FixedOffset, String> {
    let invalid = || format!("ALL_DAY_OFFSET must look like -05:00, got '{}'", s);

    let s = s.trim();
    let (sign, rest) = match s.chars().next() {
        Some('+') => (1, &s[1..]),
        Some('-') => (-1, &s[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=23).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

fn parse_duration(key: &str, s: &str) -> Result<StdDuration, String> {
    humantime::parse_duration(s.trim()).map_err(|e| format!("{key} '{s}' is not a duration: {e}"))
}

fn parse_positive_duration(key: &str, s: &str) -> Result<StdDuration, String> {
    match parse_duration(key, s)? {
        d if d.is_zero() => Err(format!("{key} must be longer than zero")),
        d => Ok(d),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
