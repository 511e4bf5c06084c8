use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::stream::{ReconnectPolicy, StreamConfig};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_CHANNEL: &str = "default";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

const ENV_API_URL: &str = "LEILAO_API_URL";
const ENV_STREAM_URL: &str = "LEILAO_STREAM_URL";
const ENV_STREAM_CHANNEL: &str = "LEILAO_STREAM_CHANNEL";
const ENV_RETRY_MS: &str = "LEILAO_RETRY_MS";
const ENV_MAX_RETRIES: &str = "LEILAO_MAX_RETRIES";
const ENV_REQUEST_TIMEOUT_MS: &str = "LEILAO_REQUEST_TIMEOUT_MS";
const ENV_SESSION_FILE: &str = "LEILAO_SESSION_FILE";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{key} must be greater than 0")]
    Zero { key: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub stream_url: String,
    pub channel: String,
    pub reconnect: ReconnectPolicy,
    pub request_timeout: Duration,
    /// Where the session id is persisted. `None` keeps it in memory only.
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            stream_url: stream_url_for(DEFAULT_API_URL, DEFAULT_CHANNEL),
            channel: DEFAULT_CHANNEL.to_string(),
            reconnect: ReconnectPolicy::default(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            session_file: None,
        }
    }
}

impl ClientConfig {
    /// Loads `.env` when present, then reads `LEILAO_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_url = get(ENV_API_URL)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let channel = get(ENV_STREAM_CHANNEL).unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
        let stream_url = get(ENV_STREAM_URL).unwrap_or_else(|| stream_url_for(&api_url, &channel));

        let mut reconnect = ReconnectPolicy::default();
        if let Some(ms) = parse_opt::<u64>(ENV_RETRY_MS, get(ENV_RETRY_MS))? {
            if ms == 0 {
                return Err(ConfigError::Zero { key: ENV_RETRY_MS });
            }
            reconnect.initial_delay = Duration::from_millis(ms);
        }
        if let Some(max) = parse_opt::<u32>(ENV_MAX_RETRIES, get(ENV_MAX_RETRIES))? {
            reconnect = reconnect.with_max_attempts(max);
        }

        let timeout_ms = parse_opt::<u64>(ENV_REQUEST_TIMEOUT_MS, get(ENV_REQUEST_TIMEOUT_MS))?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(ConfigError::Zero {
                key: ENV_REQUEST_TIMEOUT_MS,
            });
        }

        Ok(Self {
            api_url,
            stream_url,
            channel,
            reconnect,
            request_timeout: Duration::from_millis(timeout_ms),
            session_file: get(ENV_SESSION_FILE).map(PathBuf::from),
        })
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig::new(self.stream_url.clone()).with_reconnect(self.reconnect.clone())
    }
}

/// `{api}/events/stream?channel={channel}`
pub fn stream_url_for(api_url: &str, channel: &str) -> String {
    format!(
        "{}/events/stream?channel={}",
        api_url.trim_end_matches('/'),
        urlencoding::encode(channel)
    )
}

fn parse_opt<T: FromStr>(key: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| ConfigError::InvalidValue { key, value: v })
        })
        .transpose()
}
