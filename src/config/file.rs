//! Configuration file handling

use super::{EndpointConfig, ManagerConfigBuilder};
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Chain name or id used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,

    /// Endpoint pinned by the user, restored on the next start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_endpoint: Option<String>,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Custom endpoints
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,

    /// Disabled endpoints
    #[serde(default)]
    pub disabled_endpoints: DisabledEndpoints,
}

/// Global settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Seconds between health probe rounds
    #[serde(default = "default_probe_interval")]
    pub probe_interval_seconds: u64,

    /// Retries after the first attempt
    #[serde(default = "default_retries")]
    pub retry_attempts: u32,

    /// Consecutive failures before an endpoint is skipped
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

fn default_timeout() -> u64 {
    10
}

fn default_probe_interval() -> u64 {
    30
}

fn default_retries() -> u32 {
    2
}

fn default_failure_threshold() -> u32 {
    3
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            probe_interval_seconds: default_probe_interval(),
            retry_attempts: default_retries(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

/// Disabled endpoints configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisabledEndpoints {
    /// List of URLs to disable
    #[serde(default)]
    pub urls: Vec<String>,
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rpc-manager")
            .join("config.toml")
    }

    /// Load from default path
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_optional(&Self::default_path())
    }

    /// Load from a path, returning `None` if the file does not exist
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            Ok(Some(Self::load(path)?))
        } else {
            Ok(None)
        }
    }

    /// Load from a specific path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {}", path.display(), e)))?;

        let config: Self = toml::from_str(&content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Save to a specific path
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::InvalidFile(format!("Failed to create directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidFile(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::InvalidFile(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Save to default path
    pub fn save_default(&self) -> Result<()> {
        self.save(&Self::default_path())
    }

    /// Check if an endpoint URL is disabled
    pub fn is_endpoint_disabled(&self, url: &str) -> bool {
        self.disabled_endpoints.urls.iter().any(|u| u == url)
    }

    /// Layer file settings onto a config builder.
    ///
    /// File endpoints are added to the pool rather than replacing it, and
    /// disabled URLs are excluded.
    pub fn apply_to(&self, mut builder: ManagerConfigBuilder) -> ManagerConfigBuilder {
        builder = builder
            .request_timeout(Duration::from_secs(self.settings.timeout_seconds))
            .probe_interval(Duration::from_secs(self.settings.probe_interval_seconds))
            .max_retries(self.settings.retry_attempts)
            .failure_threshold(self.settings.failure_threshold);

        for endpoint in &self.endpoints {
            builder = builder.add_endpoint(endpoint.clone());
        }

        for url in &self.disabled_endpoints.urls {
            builder = builder.exclude(url.clone());
        }

        builder
    }
}
