//! Configuration for the RPC manager

mod endpoint;
mod file;

pub use endpoint::EndpointConfig;
pub use file::{ConfigFile, DisabledEndpoints, Settings};

use crate::error::{ConfigError, Result};
use crate::rpc::{default_endpoints, validate_endpoint_url};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound on retries after the first attempt
pub const MAX_RETRIES: u32 = 10;

/// Built-in endpoint that keeps the pool non-empty when nothing else is configured
pub const LOCAL_ENDPOINT: &str = "http://localhost:8545";

/// Supported chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    #[default]
    Ethereum,
    Polygon,
    Arbitrum,
    Optimism,
    Base,
    Bsc,
    Avalanche,
    /// Any other EVM chain, by chain id
    Custom(u64),
}

impl Chain {
    pub fn chain_id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Polygon => 137,
            Chain::Arbitrum => 42161,
            Chain::Optimism => 10,
            Chain::Base => 8453,
            Chain::Bsc => 56,
            Chain::Avalanche => 43114,
            Chain::Custom(id) => *id,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Chain::Ethereum => "Ethereum".to_string(),
            Chain::Polygon => "Polygon".to_string(),
            Chain::Arbitrum => "Arbitrum One".to_string(),
            Chain::Optimism => "Optimism".to_string(),
            Chain::Base => "Base".to_string(),
            Chain::Bsc => "BNB Smart Chain".to_string(),
            Chain::Avalanche => "Avalanche C-Chain".to_string(),
            Chain::Custom(id) => format!("Chain {}", id),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Chain {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ethereum" | "eth" | "mainnet" | "1" => Ok(Chain::Ethereum),
            "polygon" | "matic" | "137" => Ok(Chain::Polygon),
            "arbitrum" | "arb" | "42161" => Ok(Chain::Arbitrum),
            "optimism" | "op" | "10" => Ok(Chain::Optimism),
            "base" | "8453" => Ok(Chain::Base),
            "bsc" | "bnb" | "56" => Ok(Chain::Bsc),
            "avalanche" | "avax" | "43114" => Ok(Chain::Avalanche),
            other => other
                .parse::<u64>()
                .map(Chain::Custom)
                .map_err(|_| ConfigError::InvalidChain(s.to_string())),
        }
    }
}

/// Runtime configuration for an [`RpcManager`](crate::RpcManager)
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Chain the endpoints serve
    pub chain: Chain,
    /// Endpoint pool seed, ordered by priority (highest first)
    pub endpoints: Vec<EndpointConfig>,
    /// Timeout for a dispatched RPC call
    pub request_timeout: Duration,
    /// Timeout for a single liveness probe
    pub probe_timeout: Duration,
    /// Base interval between probe rounds
    pub probe_interval: Duration,
    /// Maximum +/- jitter applied to the probe interval
    pub probe_jitter: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub backoff_base: Duration,
    /// Multiplier applied to the delay for each further retry
    pub backoff_factor: u32,
    /// Consecutive failures after which an endpoint counts as unhealthy
    pub failure_threshold: u32,
    /// Weight of a new latency sample in the moving average
    pub latency_weight: f64,
    /// JSON-RPC method used for liveness probes
    pub probe_method: String,
}

impl ManagerConfig {
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::default()
    }

    /// Total attempts a dispatched call may make
    pub fn attempt_budget(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Ethereum with its built-in public endpoints, the same pool
/// `ManagerConfig::builder().build()` produces
impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            chain: Chain::Ethereum,
            endpoints: default_endpoints(Chain::Ethereum),
            request_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            probe_interval: Duration::from_secs(30),
            probe_jitter: Duration::from_secs(5),
            max_retries: 2,
            backoff_base: Duration::from_millis(250),
            backoff_factor: 2,
            failure_threshold: 3,
            latency_weight: 0.3,
            probe_method: "eth_blockNumber".to_string(),
        }
    }
}

/// Builder for [`ManagerConfig`]
#[derive(Debug, Clone, Default)]
pub struct ManagerConfigBuilder {
    chain: Option<Chain>,
    endpoints: Vec<EndpointConfig>,
    add_endpoints: Vec<EndpointConfig>,
    exclude_endpoints: Vec<String>,
    request_timeout: Option<Duration>,
    probe_timeout: Option<Duration>,
    probe_interval: Option<Duration>,
    probe_jitter: Option<Duration>,
    max_retries: Option<u32>,
    backoff_base: Option<Duration>,
    backoff_factor: Option<u32>,
    failure_threshold: Option<u32>,
    latency_weight: Option<f64>,
    probe_method: Option<String>,
}

impl ManagerConfigBuilder {
    pub fn chain(mut self, chain: Chain) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Use exactly these endpoints instead of the chain defaults
    pub fn endpoint(mut self, endpoint: EndpointConfig) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn endpoints(mut self, endpoints: impl IntoIterator<Item = EndpointConfig>) -> Self {
        self.endpoints.extend(endpoints);
        self
    }

    /// Add an endpoint on top of whatever pool is chosen
    pub fn add_endpoint(mut self, endpoint: EndpointConfig) -> Self {
        self.add_endpoints.push(endpoint);
        self
    }

    pub fn exclude(mut self, url: impl Into<String>) -> Self {
        self.exclude_endpoints.push(url.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    pub fn probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = Some(interval);
        self
    }

    pub fn probe_jitter(mut self, jitter: Duration) -> Self {
        self.probe_jitter = Some(jitter);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn backoff(mut self, base: Duration, factor: u32) -> Self {
        self.backoff_base = Some(base);
        self.backoff_factor = Some(factor);
        self
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = Some(threshold);
        self
    }

    pub fn latency_weight(mut self, weight: f64) -> Self {
        self.latency_weight = Some(weight);
        self
    }

    pub fn probe_method(mut self, method: impl Into<String>) -> Self {
        self.probe_method = Some(method.into());
        self
    }

    pub fn build(self) -> Result<ManagerConfig> {
        let defaults = ManagerConfig::default();
        let chain = self.chain.unwrap_or_default();

        let failure_threshold = self.failure_threshold.unwrap_or(defaults.failure_threshold);
        if failure_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "failure_threshold",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        let latency_weight = self.latency_weight.unwrap_or(defaults.latency_weight);
        if !(latency_weight > 0.0 && latency_weight <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "latency_weight",
                reason: format!("{} is outside (0, 1]", latency_weight),
            }
            .into());
        }

        let backoff_factor = self.backoff_factor.unwrap_or(defaults.backoff_factor);
        if backoff_factor == 0 {
            return Err(ConfigError::InvalidValue {
                field: "backoff_factor",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        let max_retries = self.max_retries.unwrap_or(defaults.max_retries);
        if max_retries > MAX_RETRIES {
            return Err(ConfigError::InvalidValue {
                field: "max_retries",
                reason: format!("{} exceeds the limit of {}", max_retries, MAX_RETRIES),
            }
            .into());
        }

        let request_timeout = self.request_timeout.unwrap_or(defaults.request_timeout);
        let probe_timeout = self.probe_timeout.unwrap_or(defaults.probe_timeout);
        let probe_interval = self.probe_interval.unwrap_or(defaults.probe_interval);
        let probe_jitter = self.probe_jitter.unwrap_or(defaults.probe_jitter);
        for (field, value) in [
            ("request_timeout", request_timeout),
            ("probe_timeout", probe_timeout),
            ("probe_interval", probe_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than zero".to_string(),
                }
                .into());
            }
        }
        if probe_jitter >= probe_interval {
            return Err(ConfigError::InvalidValue {
                field: "probe_jitter",
                reason: format!(
                    "{:?} must be smaller than the probe interval {:?}",
                    probe_jitter, probe_interval
                ),
            }
            .into());
        }

        let user_supplied = !self.endpoints.is_empty() || !self.add_endpoints.is_empty();
        let endpoints = seed_endpoints(
            chain,
            self.endpoints,
            self.add_endpoints,
            &self.exclude_endpoints,
        );

        let endpoints = if endpoints.is_empty() {
            if user_supplied {
                return Err(ConfigError::NoEndpoints.into());
            }
            tracing::warn!(
                "No endpoints available for {}, falling back to {}",
                chain.display_name(),
                LOCAL_ENDPOINT
            );
            vec![EndpointConfig::new(LOCAL_ENDPOINT).with_note("built-in default")]
        } else {
            endpoints
        };

        Ok(ManagerConfig {
            chain,
            endpoints,
            request_timeout,
            probe_timeout,
            probe_interval,
            probe_jitter,
            max_retries,
            backoff_base: self.backoff_base.unwrap_or(defaults.backoff_base),
            backoff_factor,
            failure_threshold,
            latency_weight,
            probe_method: self.probe_method.unwrap_or(defaults.probe_method),
        })
    }
}

/// Resolve the endpoint pool: explicit endpoints (or chain defaults), plus
/// additions, minus exclusions, disabled and malformed entries, deduplicated
/// and ordered by priority.
fn seed_endpoints(
    chain: Chain,
    explicit: Vec<EndpointConfig>,
    additional: Vec<EndpointConfig>,
    excluded: &[String],
) -> Vec<EndpointConfig> {
    let mut candidates = if explicit.is_empty() {
        default_endpoints(chain)
    } else {
        explicit
    };
    candidates.extend(additional);

    let excluded: HashSet<&str> = excluded.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut endpoints = Vec::new();

    for mut cfg in candidates {
        if !cfg.enabled || excluded.contains(cfg.url.as_str()) {
            continue;
        }

        match validate_endpoint_url(&cfg.url) {
            Ok(url) => cfg.url = url,
            Err(e) => {
                tracing::warn!("Skipping endpoint {}: {}", cfg.url, e);
                continue;
            }
        }

        if seen.insert(cfg.url.clone()) {
            endpoints.push(cfg);
        }
    }

    // Stable sort keeps configuration order within a priority
    endpoints.sort_by(|a, b| b.priority.cmp(&a.priority));
    endpoints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_parse() {
        assert_eq!("ethereum".parse::<Chain>().unwrap(), Chain::Ethereum);
        assert_eq!("ARB".parse::<Chain>().unwrap(), Chain::Arbitrum);
        assert_eq!("8453".parse::<Chain>().unwrap(), Chain::Base);
        assert_eq!("31337".parse::<Chain>().unwrap(), Chain::Custom(31337));
        assert!("solana".parse::<Chain>().is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let config = ManagerConfig::builder().build().unwrap();

        assert_eq!(config.chain, Chain::Ethereum);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.probe_interval, Duration::from_secs(30));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.attempt_budget(), 3);
        assert_eq!(config.failure_threshold, 3);
        assert!(!config.endpoints.is_empty());
    }

    #[test]
    fn test_explicit_endpoints_sorted_and_deduped() {
        let config = ManagerConfig::builder()
            .endpoint(EndpointConfig::new("https://low.example").with_priority(1))
            .endpoint(EndpointConfig::new("https://high.example").with_priority(9))
            .endpoint(EndpointConfig::new("https://low.example").with_priority(7))
            .endpoint(EndpointConfig::new("https://off.example").with_enabled(false))
            .build()
            .unwrap();

        let urls: Vec<_> = config.endpoints.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://high.example", "https://low.example"]);
    }

    #[test]
    fn test_invalid_urls_dropped() {
        let config = ManagerConfig::builder()
            .endpoint(EndpointConfig::new("not-a-url"))
            .endpoint(EndpointConfig::new("https://ok.example"))
            .build()
            .unwrap();

        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.endpoints[0].url, "https://ok.example");

        let err = ManagerConfig::builder()
            .endpoint(EndpointConfig::new("not-a-url"))
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn test_custom_chain_falls_back_to_local() {
        let config = ManagerConfig::builder()
            .chain(Chain::Custom(31337))
            .build()
            .unwrap();

        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.endpoints[0].url, LOCAL_ENDPOINT);
    }

    #[test]
    fn test_exclusions_apply_to_defaults() {
        let defaults = default_endpoints(Chain::Base);
        let excluded = defaults[0].url.clone();

        let config = ManagerConfig::builder()
            .chain(Chain::Base)
            .exclude(excluded.clone())
            .build()
            .unwrap();

        assert_eq!(config.endpoints.len(), defaults.len() - 1);
        assert!(config.endpoints.iter().all(|e| e.url != excluded));
    }

    #[test]
    fn test_rejects_bad_tuning() {
        assert!(ManagerConfig::builder()
            .failure_threshold(0)
            .build()
            .is_err());
        assert!(ManagerConfig::builder().latency_weight(1.5).build().is_err());
        assert!(ManagerConfig::builder()
            .backoff(Duration::from_millis(100), 0)
            .build()
            .is_err());
        assert!(ManagerConfig::builder()
            .max_retries(u32::MAX)
            .build()
            .is_err());
        assert!(ManagerConfig::builder()
            .max_retries(MAX_RETRIES)
            .build()
            .is_ok());
    }

    #[test]
    fn test_rejects_bad_timing() {
        let zero = [
            ManagerConfig::builder().request_timeout(Duration::ZERO),
            ManagerConfig::builder().probe_timeout(Duration::ZERO),
            ManagerConfig::builder().probe_interval(Duration::ZERO),
        ];
        for builder in zero {
            assert!(builder.build().is_err());
        }

        // Jitter must leave a strictly positive delay between rounds
        assert!(ManagerConfig::builder()
            .probe_interval(Duration::from_secs(5))
            .build()
            .is_err());
        assert!(ManagerConfig::builder()
            .probe_interval(Duration::from_secs(10))
            .probe_jitter(Duration::from_secs(10))
            .build()
            .is_err());

        let config = ManagerConfig::builder()
            .probe_interval(Duration::from_secs(2))
            .probe_jitter(Duration::ZERO)
            .build()
            .unwrap();
        assert_eq!(config.probe_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_default_matches_builder_pool() {
        let built = ManagerConfig::builder().build().unwrap();
        let default = ManagerConfig::default();

        assert_eq!(default.chain, built.chain);
        let urls = |c: &ManagerConfig| c.endpoints.iter().map(|e| e.url.clone()).collect::<Vec<_>>();
        assert_eq!(urls(&default), urls(&built));
    }
}
