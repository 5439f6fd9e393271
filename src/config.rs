//! Environment-backed settings for the pipelines.

use std::time::Duration;

use crate::error::ConfigError;
use crate::publish::DEFAULT_API_URL;
use crate::summary::DEFAULT_PROMPT;
use crate::util::csv::parse_csv;
use crate::util::time::parse_duration_str;

const DEFAULT_FETCH_INTERVAL: Duration = Duration::from_secs(10 * 60);
const DEFAULT_NOTIFICATION_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone)]
pub struct Settings {
    pub fetch_interval: Duration,
    pub notification_interval: Duration,
    /// Defaults to twice the fetch interval.
    pub lookup_window: Duration,
    pub filter_keywords: Vec<String>,
    /// `None` disables summaries.
    pub openai_api_key: Option<String>,
    pub openai_prompt: String,
    pub http_timeout: Duration,
    lookup_window_set: bool,
    telegram_token: Option<String>,
    telegram_channel_id: Option<i64>,
    telegram_api_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub channel_id: i64,
    pub api_url: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let fetch_interval = duration_var(&get, "FETCH_INTERVAL")?.unwrap_or(DEFAULT_FETCH_INTERVAL);
        let notification_interval =
            duration_var(&get, "NOTIFICATION_INTERVAL")?.unwrap_or(DEFAULT_NOTIFICATION_INTERVAL);
        let explicit_window = duration_var(&get, "LOOKUP_WINDOW")?;
        let lookup_window = explicit_window.unwrap_or(fetch_interval * 2);

        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(invalid("HTTP_TIMEOUT_SECS", format!("expected a positive number of seconds, got {raw:?}"))),
            },
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        let telegram_channel_id = match get("TELEGRAM_CHANNEL_ID") {
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|e| invalid("TELEGRAM_CHANNEL_ID", format!("{raw:?}: {e}")))?,
            ),
            None => None,
        };

        Ok(Self {
            fetch_interval,
            notification_interval,
            lookup_window,
            filter_keywords: get("FILTER_KEYWORDS")
                .map(|v| parse_csv(&v).into_iter().map(|k| k.to_lowercase()).collect())
                .unwrap_or_default(),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_prompt: lookup("OPENAI_PROMPT").filter(|p| !p.trim().is_empty()).unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            http_timeout,
            lookup_window_set: explicit_window.is_some(),
            telegram_token: get("TELEGRAM_BOT_TOKEN"),
            telegram_channel_id,
            telegram_api_url: get("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        })
    }

    /// Replace the fetch interval; a derived lookup window follows it.
    pub fn set_fetch_interval(&mut self, every: Duration) {
        self.fetch_interval = every;
        if !self.lookup_window_set {
            self.lookup_window = every * 2;
        }
    }

    pub fn set_lookup_window(&mut self, window: Duration) {
        self.lookup_window = window;
        self.lookup_window_set = true;
    }

    /// Publishing settings; required only by commands that deliver.
    pub fn telegram(&self) -> Result<TelegramSettings, ConfigError> {
        let bot_token = self
            .telegram_token
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".into()))?;
        let channel_id = self
            .telegram_channel_id
            .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_CHANNEL_ID".into()))?;
        Ok(TelegramSettings { bot_token, channel_id, api_url: self.telegram_api_url.clone() })
    }
}

fn duration_var<G>(get: &G, key: &str) -> Result<Option<Duration>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => parse_duration_str(&raw)
            .map(Some)
            .ok_or_else(|| invalid(key, format!("expected a duration like 90s, 10m or 1h, got {raw:?}"))),
    }
}

fn invalid(key: &str, message: String) -> ConfigError {
    ConfigError::InvalidValue { key: key.to_string(), message }
}
