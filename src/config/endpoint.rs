//! RPC endpoint configuration

use serde::{Deserialize, Serialize};

/// Configuration for a single RPC endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// RPC URL
    pub url: String,
    /// Priority (higher = preferred)
    #[serde(default = "default_priority")]
    pub priority: u8,
    /// Optional note about the endpoint
    #[serde(default)]
    pub note: Option<String>,
    /// Whether this endpoint is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_priority() -> u8 {
    5
}

fn default_enabled() -> bool {
    true
}

impl EndpointConfig {
    /// Create a new endpoint config with defaults
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            priority: default_priority(),
            note: None,
            enabled: true,
        }
    }

    /// Builder-style setter for priority
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Builder-style setter for note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Builder-style setter for enabled
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::new(super::LOCAL_ENDPOINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_config() {
        let config = EndpointConfig::new("https://example.com/rpc")
            .with_priority(10)
            .with_note("primary");

        assert_eq!(config.url, "https://example.com/rpc");
        assert_eq!(config.priority, 10);
        assert_eq!(config.note.as_deref(), Some("primary"));
        assert!(config.enabled);
    }

    #[test]
    fn test_serde_defaults() {
        let config: EndpointConfig =
            serde_json::from_str(r#"{"url": "https://example.com/rpc"}"#).unwrap();

        assert_eq!(config.priority, 5);
        assert!(config.enabled);
        assert!(config.note.is_none());
    }
}
