//! Client configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default server endpoint.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:9990/ws";
/// Failed reconnects before the connection is reported as lost for good.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
/// Pause between reconnect attempts in milliseconds.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1000;
/// Environment variable overriding [`ClientConfig::server_url`].
pub const SERVER_URL_ENV: &str = "IDR_SERVER_URL";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings for the sync client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket endpoint of the layout server.
    pub server_url: String,
    /// Consecutive failed reconnects tolerated before giving up.
    pub max_reconnect_attempts: u32,
    /// Delay between reconnect attempts, in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Skip reporting drags that ended where they started.
    pub suppress_zero_moves: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            suppress_zero_moves: true,
        }
    }
}

impl ClientConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Apply `IDR_SERVER_URL` if set.
    pub fn with_env_overrides(self) -> Self {
        self.with_server_url_override(std::env::var(SERVER_URL_ENV).ok())
    }

    fn with_server_url_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            log::info!("Server URL overridden: {}", url);
            self.server_url = url;
        }
        self
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_delay(), Duration::from_secs(1));
        assert!(config.suppress_zero_moves);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"server_url":"ws://10.0.0.2:9990/ws","reconnect_delay_ms":250}}"#).unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.server_url, "ws://10.0.0.2:9990/ws");
        assert_eq!(config.reconnect_delay_ms, 250);
        assert_eq!(config.max_reconnect_attempts, DEFAULT_MAX_RECONNECT_ATTEMPTS);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(ClientConfig::load(&missing), Err(ConfigError::Io(_))));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(ClientConfig::load(&bad), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_server_url_override() {
        let config = ClientConfig::default()
            .with_server_url_override(Some("ws://example.org/ws".to_string()));
        assert_eq!(config.server_url, "ws://example.org/ws");

        let config = ClientConfig::default().with_server_url_override(Some("  ".to_string()));
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    }
}
