//! Runtime configuration for client apps.
//!
//! Values come from an optional JSON file, overridden by `MINDFUL_*`
//! environment variables. Everything is optional: without a remote URL the
//! journal runs purely local.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::db::RemoteConfig;
use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const ENV_DATA_DIR: &str = "MINDFUL_DATA_DIR";
pub const ENV_REMOTE_URL: &str = "MINDFUL_REMOTE_URL";
pub const ENV_REMOTE_TOKEN: &str = "MINDFUL_REMOTE_TOKEN";
pub const ENV_PROBE_URL: &str = "MINDFUL_PROBE_URL";
pub const ENV_POLL_INTERVAL_SECS: &str = "MINDFUL_POLL_INTERVAL_SECS";

const REMOTE_URL_SCHEMES: [&str; 4] = ["libsql://", "https://", "http://", "wss://"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Directory holding the local database
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// libSQL endpoint of the remote journal mirror
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub remote_token: Option<String>,
    /// HTTP endpoint polled to decide whether we are online
    #[serde(default)]
    pub probe_url: Option<String>,
    /// How often remote changes and connectivity are polled
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

impl AppConfig {
    /// Parse a JSON config file
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw).map_err(|error| {
            Error::Config(format!("invalid config file '{}': {error}", path.display()))
        })
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read the `MINDFUL_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let poll_interval_secs = match normalize_text_option(lookup(ENV_POLL_INTERVAL_SECS)) {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                Error::Config(format!(
                    "{ENV_POLL_INTERVAL_SECS} must be a whole number of seconds, got '{raw}'"
                ))
            })?),
            None => None,
        };

        let config = Self {
            data_dir: normalize_text_option(lookup(ENV_DATA_DIR)).map(PathBuf::from),
            remote_url: normalize_text_option(lookup(ENV_REMOTE_URL)),
            remote_token: normalize_text_option(lookup(ENV_REMOTE_TOKEN)),
            probe_url: normalize_text_option(lookup(ENV_PROBE_URL)),
            poll_interval_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Fields set in `overrides` replace ours
    #[must_use]
    pub fn merged_with(self, overrides: Self) -> Self {
        Self {
            data_dir: overrides.data_dir.or(self.data_dir),
            remote_url: overrides.remote_url.or(self.remote_url),
            remote_token: overrides.remote_token.or(self.remote_token),
            probe_url: overrides.probe_url.or(self.probe_url),
            poll_interval_secs: overrides.poll_interval_secs.or(self.poll_interval_secs),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = normalize_text_option(self.remote_url.clone()) {
            if !REMOTE_URL_SCHEMES
                .iter()
                .any(|scheme| url.starts_with(scheme))
            {
                return Err(Error::Config(
                    "remote_url must start with libsql://, https://, http:// or wss://"
                        .to_string(),
                ));
            }
        }
        if let Some(url) = normalize_text_option(self.probe_url.clone()) {
            if !is_http_url(&url) {
                return Err(Error::Config(
                    "probe_url must include http:// or https://".to_string(),
                ));
            }
        }
        if self.poll_interval_secs == Some(0) {
            return Err(Error::Config(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs.map(Duration::from_secs)
    }

    /// Connection settings for the remote mirror, when one is configured
    pub fn remote_config(&self) -> Option<RemoteConfig> {
        let url = normalize_text_option(self.remote_url.clone())?;
        let token = normalize_text_option(self.remote_token.clone()).unwrap_or_default();
        let config = RemoteConfig::new(url, token);
        Some(match self.poll_interval() {
            Some(interval) => config.with_poll_interval(interval),
            None => config,
        })
    }

    /// Reachability endpoint; falls back to the remote URL when it is HTTP(S)
    pub fn probe_url(&self) -> Option<String> {
        normalize_text_option(self.probe_url.clone()).or_else(|| {
            normalize_text_option(self.remote_url.clone()).filter(|url| is_http_url(url))
        })
    }
}
