//! Configuration types.
//!
//! Settings are loaded from a TOML file and every field carries a
//! default, so a missing file section (or a missing file, handled by the
//! caller) falls back to stock behavior.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Conversation behavior settings.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ConversationConfig {
    /// Delay before an assistant turn's quick actions become
    /// interactable, in milliseconds.
    #[serde(default = "default_reveal_delay_ms")]
    pub reveal_delay_ms: u64,
}

fn default_reveal_delay_ms() -> u64 {
    1000
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            reveal_delay_ms: default_reveal_delay_ms(),
        }
    }
}

impl ConversationConfig {
    /// Returns the reveal delay as a `Duration`.
    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }
}

/// Responder endpoint settings.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ResponderConfig {
    /// Webhook endpoint URL. None means no endpoint is configured.
    pub endpoint: Option<String>,
    /// Bearer token attached to webhook requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ResponderConfig {
    /// Returns the request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Root configuration for the studio.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct StudioConfig {
    /// Conversation behavior settings.
    #[serde(default)]
    pub conversation: ConversationConfig,
    /// Responder endpoint settings.
    #[serde(default)]
    pub responder: ResponderConfig,
}

impl StudioConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an `Io` error when the file cannot be read, or a
    /// `Serialization` error when it is not valid TOML for this shape.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StudioConfig::default();
        assert_eq!(config.conversation.reveal_delay_ms, 1000);
        assert_eq!(config.conversation.reveal_delay(), Duration::from_millis(1000));
        assert!(config.responder.endpoint.is_none());
        assert_eq!(config.responder.timeout_secs, 30);
    }

    #[test]
    fn test_load_full_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("muse.toml");
        std::fs::write(
            &path,
            r#"
[conversation]
reveal_delay_ms = 250

[responder]
endpoint = "https://hooks.example.com/assistant"
auth_token = "secret"
timeout_secs = 5
"#,
        )
        .unwrap();

        let config = StudioConfig::load(&path).unwrap();
        assert_eq!(config.conversation.reveal_delay_ms, 250);
        assert_eq!(
            config.responder.endpoint.as_deref(),
            Some("https://hooks.example.com/assistant")
        );
        assert_eq!(config.responder.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.responder.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("muse.toml");
        std::fs::write(&path, "[responder]\nendpoint = \"https://x.test/hook\"\n").unwrap();

        let config = StudioConfig::load(&path).unwrap();
        assert_eq!(config.conversation.reveal_delay_ms, 1000);
        assert_eq!(config.responder.timeout_secs, 30);
        assert_eq!(config.responder.endpoint.as_deref(), Some("https://x.test/hook"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = StudioConfig::load("/nonexistent/muse.toml").unwrap_err();
        assert!(matches!(err, crate::MuseError::Io { .. }));
    }
}
