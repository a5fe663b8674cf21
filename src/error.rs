//! Error types for rpc-manager

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// RPC-related errors
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// RPC-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    /// Connection refused, DNS failure, bad HTTP status
    #[error("Transport error from {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// Error-coded or malformed JSON-RPC response
    #[error("RPC protocol error from {url} (code {code}): {message}")]
    Protocol {
        url: String,
        code: i64,
        message: String,
    },

    #[error("All endpoints unhealthy after {attempts} attempts, last error: {last}")]
    AllEndpointsUnhealthy { attempts: u32, last: Box<RpcError> },

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl RpcError {
    /// Whether the failure happened below the JSON-RPC layer
    pub fn is_transport(&self) -> bool {
        matches!(self, RpcError::Transport { .. } | RpcError::Timeout { .. })
    }

    /// URL of the endpoint that produced this error, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            RpcError::Transport { url, .. }
            | RpcError::Timeout { url, .. }
            | RpcError::Protocol { url, .. } => Some(url),
            RpcError::AllEndpointsUnhealthy { last, .. } => last.url(),
            RpcError::InvalidEndpoint(_) | RpcError::Cancelled => None,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config file: {0}")]
    InvalidFile(String),

    #[error("Invalid chain: {0}")]
    InvalidChain(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("No usable endpoints configured")]
    NoEndpoints,

    #[error("Config file parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
