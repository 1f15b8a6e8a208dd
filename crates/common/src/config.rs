use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

pub const DEFAULT_FUTURES_BASE: &str = "https://fapi.binance.com";

/// Seven days, the retention of a recorded higher-timeframe direction.
pub const DEFAULT_DIRECTION_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Webhook
    pub tv_secret: String,
    pub port: u16,

    // Telegram (both optional: unset means notifications are skipped)
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,

    // Networked direction store (both must be set to use it)
    pub redis_url: Option<String>,
    pub redis_token: Option<String>,

    // Macro-event blackout
    pub macro_window_hours: f64,
    pub macro_events: Vec<DateTime<Utc>>,

    // Collaborators
    pub binance_futures_base: String,
    pub http_timeout: Duration,
    pub direction_ttl: Duration,

    // Optional TOML overrides for vocabulary / pivot / filter parameters
    pub signal_config_path: Option<String>,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let macro_events = optional_env("MACRO_EVENTS_UTC")
            .map(|raw| parse_macro_events(&raw))
            .unwrap_or_default();

        Config {
            tv_secret: required_env("TV_SECRET"),
            port: optional_env("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            telegram_token: optional_env("TG_BOT_TOKEN"),
            telegram_chat_id: optional_env("TG_CHAT_ID"),
            redis_url: optional_env("REDIS_URL"),
            redis_token: optional_env("REDIS_TOKEN"),
            macro_window_hours: optional_env("MACRO_WINDOW_HOURS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(12.0),
            macro_events,
            binance_futures_base: optional_env("BINANCE_FUTURES_BASE")
                .unwrap_or_else(|| DEFAULT_FUTURES_BASE.to_string()),
            http_timeout: optional_env("HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(5)),
            direction_ttl: optional_env("DIRECTION_TTL_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_DIRECTION_TTL),
            signal_config_path: optional_env("SIGNAL_CONFIG_PATH"),
        }
    }

    /// REST store endpoint and bearer token, when both are configured.
    pub fn rest_store(&self) -> Option<(&str, &str)> {
        match (&self.redis_url, &self.redis_token) {
            (Some(url), Some(token)) => Some((url.as_str(), token.as_str())),
            _ => None,
        }
    }

    /// Telegram token and chat id, when both are configured.
    pub fn telegram(&self) -> Option<(&str, &str)> {
        match (&self.telegram_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) => Some((token.as_str(), chat.as_str())),
            _ => None,
        }
    }
}

/// Parse a comma-separated list of UTC timestamps. Entries that are blank or
/// unparsable are skipped.
pub fn parse_macro_events(raw: &str) -> Vec<DateTime<Utc>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match parse_utc_timestamp(s) {
            Some(ts) => Some(ts),
            None => {
                warn!(entry = %s, "Skipping unparsable MACRO_EVENTS_UTC entry");
                None
            }
        })
        .collect()
}

/// Accepts RFC 3339 (`2025-03-12T12:30:00Z`) or a zone-less
/// `YYYY-MM-DDTHH:MM[:SS]` which is read as UTC.
pub fn parse_utc_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
