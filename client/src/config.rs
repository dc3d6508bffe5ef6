//! Configuration management for the client.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default period between background syncs.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(15);

/// Default bound on a single gateway call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the quotesync server; the in-memory demo remote is used
    /// when unset
    pub server_url: Option<String>,
    /// Where the local state document lives
    pub state_path: PathBuf,
    /// Period between background syncs
    pub sync_interval: Duration,
    /// Bound on every gateway call
    pub remote_timeout: Duration,
    /// Bearer token sent to the server
    pub auth_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            state_path: PathBuf::from("quotesync-state.json"),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            auth_token: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let sync_interval = match non_empty("QUOTESYNC_SYNC_INTERVAL_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidSyncInterval(raw)),
            },
            None => defaults.sync_interval,
        };

        let remote_timeout = match non_empty("QUOTESYNC_REMOTE_TIMEOUT_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(millis) if millis > 0 => Duration::from_millis(millis),
                _ => return Err(ConfigError::InvalidRemoteTimeout(raw)),
            },
            None => defaults.remote_timeout,
        };

        Ok(Self {
            server_url: non_empty("QUOTESYNC_SERVER_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string()),
            state_path: non_empty("QUOTESYNC_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_path),
            sync_interval,
            remote_timeout,
            auth_token: non_empty("QUOTESYNC_AUTH_TOKEN"),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid QUOTESYNC_SYNC_INTERVAL_SECS value: {0}")]
    InvalidSyncInterval(String),

    #[error("Invalid QUOTESYNC_REMOTE_TIMEOUT_MS value: {0}")]
    InvalidRemoteTimeout(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.sync_interval, Duration::from_secs(15));
    }

    #[test]
    fn reads_every_variable() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("QUOTESYNC_SERVER_URL", "http://localhost:3000/"),
            ("QUOTESYNC_STATE_PATH", "/tmp/state.json"),
            ("QUOTESYNC_SYNC_INTERVAL_SECS", "30"),
            ("QUOTESYNC_REMOTE_TIMEOUT_MS", "250"),
            ("QUOTESYNC_AUTH_TOKEN", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.server_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.state_path, PathBuf::from("/tmp/state.json"));
        assert_eq!(config.sync_interval, Duration::from_secs(30));
        assert_eq!(config.remote_timeout, Duration::from_millis(250));
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
    }

    #[test]
    fn rejects_bad_numbers() {
        assert_eq!(
            ClientConfig::from_lookup(lookup(&[("QUOTESYNC_SYNC_INTERVAL_SECS", "0")])),
            Err(ConfigError::InvalidSyncInterval("0".into()))
        );
        assert_eq!(
            ClientConfig::from_lookup(lookup(&[("QUOTESYNC_REMOTE_TIMEOUT_MS", "soon")])),
            Err(ConfigError::InvalidRemoteTimeout("soon".into()))
        );
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config =
            ClientConfig::from_lookup(lookup(&[("QUOTESYNC_SERVER_URL", "  ")])).unwrap();
        assert!(config.server_url.is_none());
    }
}
