//! Client configuration: TOML file, then environment overrides.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::TimeDelta;
use domain::models::event::default_event_window;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const API_URL_ENV: &str = "KIVORA_API_URL";
pub const POLL_INTERVAL_ENV: &str = "KIVORA_POLL_INTERVAL_SECS";
pub const SWEEP_INTERVAL_ENV: &str = "KIVORA_SWEEP_INTERVAL_SECS";

/// One day.
pub const MAX_EVENT_WINDOW_MINUTES: i64 = 24 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Retries for GET requests only.
    pub max_retries: usize,
    pub notification_poll_interval_secs: u64,
    pub event_sweep_interval_secs: u64,
    pub event_window_minutes: i64,
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/kivora/v1/".to_string(),
            request_timeout_secs: 30,
            max_retries: 3,
            notification_poll_interval_secs: 10,
            event_sweep_interval_secs: 60,
            event_window_minutes: 10,
            session_file: None,
        }
    }
}

impl ClientConfig {
    /// Read `path` if it exists, apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            Some(path) => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overrides from the environment, read through `lookup` so tests need not
    /// touch the process environment.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(API_URL_ENV) {
            self.api_base_url = url;
        }
        if let Some(raw) = lookup(POLL_INTERVAL_ENV) {
            self.notification_poll_interval_secs = parse_secs(POLL_INTERVAL_ENV, &raw)?;
        }
        if let Some(raw) = lookup(SWEEP_INTERVAL_ENV) {
            self.event_sweep_interval_secs = parse_secs(SWEEP_INTERVAL_ENV, &raw)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.api_base_url).map_err(|e| ConfigError::Invalid {
            key: "api_base_url",
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: "api_base_url",
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        for (key, value) in [
            ("request_timeout_secs", self.request_timeout_secs),
            ("notification_poll_interval_secs", self.notification_poll_interval_secs),
            ("event_sweep_interval_secs", self.event_sweep_interval_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        if !(1..=MAX_EVENT_WINDOW_MINUTES).contains(&self.event_window_minutes) {
            return Err(ConfigError::Invalid {
                key: "event_window_minutes",
                reason: format!("must be between 1 and {MAX_EVENT_WINDOW_MINUTES}"),
            });
        }
        Ok(())
    }

    pub fn notification_poll_interval(&self) -> Duration {
        Duration::from_secs(self.notification_poll_interval_secs)
    }

    pub fn event_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.event_sweep_interval_secs)
    }

    /// Falls back to the default window when the configured one is out of
    /// range, so unvalidated configs cannot panic.
    pub fn event_window(&self) -> TimeDelta {
        match self.event_window_minutes {
            1..=MAX_EVENT_WINDOW_MINUTES => TimeDelta::try_minutes(self.event_window_minutes)
                .unwrap_or_else(default_event_window),
            _ => default_event_window(),
        }
    }
}

fn parse_secs(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        reason: format!("expected seconds, got {raw:?}"),
    })
}
