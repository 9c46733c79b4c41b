//! Client configuration.
//!
//! Built in code with `ClientConfig::new(..).with_*(..)`, read from the
//! `COPRHD_*` environment variables, or deserialized by the surrounding
//! application from whatever file format it owns.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{ApiError, Result};

/// How long a mutating call waits for its task to become ready.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_URL: &str = "COPRHD_URL";
pub const ENV_TOKEN: &str = "COPRHD_TOKEN";
pub const ENV_TASK_TIMEOUT_SECS: &str = "COPRHD_TASK_TIMEOUT_SECS";
pub const ENV_POLL_INTERVAL_MS: &str = "COPRHD_POLL_INTERVAL_MS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Controller API root, e.g. `https://controller:4443`.
    pub base_url: String,
    /// Value sent as `X-SDS-AUTH-TOKEN`.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(
        default = "default_request_timeout",
        rename = "request_timeout_secs",
        deserialize_with = "secs"
    )]
    pub request_timeout: Duration,
    #[serde(
        default = "default_task_timeout",
        rename = "task_timeout_secs",
        deserialize_with = "secs"
    )]
    pub task_timeout: Duration,
    #[serde(
        default = "default_poll_interval",
        rename = "poll_interval_ms",
        deserialize_with = "millis"
    )]
    pub poll_interval: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(ENV_URL)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ApiError::Config(format!("{ENV_URL} is not set")))?;
        let mut config = Self::new(&url);

        if let Some(token) = lookup(ENV_TOKEN).filter(|t| !t.is_empty()) {
            config.token = Some(token);
        }
        if let Some(raw) = lookup(ENV_TASK_TIMEOUT_SECS) {
            config.task_timeout = Duration::from_secs(parse_number(ENV_TASK_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            let ms = parse_number(ENV_POLL_INTERVAL_MS, &raw)?;
            if ms == 0 {
                return Err(ApiError::Config(format!("{ENV_POLL_INTERVAL_MS} must be greater than zero")));
            }
            config.poll_interval = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::Config(format!("{key} must be a non-negative integer, got `{raw}`")))
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_task_timeout() -> Duration {
    DEFAULT_TASK_TIMEOUT
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn secs<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Duration, D::Error> {
    u64::deserialize(d).map(Duration::from_secs)
}

fn millis<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Duration, D::Error> {
    match u64::deserialize(d)? {
        0 => Err(serde::de::Error::custom("poll_interval_ms must be greater than zero")),
        ms => Ok(Duration::from_millis(ms)),
    }
}
