//! Error types for the network traffic scorer
//!
//! Construction failures ([`ConfigError`], [`ClientInitError`], wrapped in
//! [`PluginError`]) are fatal and surface before the plugin serves any
//! request. Runtime failures are per node ([`BackendError`] inside
//! [`ScoringError`]) or per cycle ([`NormalizationError`]).

use std::time::Duration;
use thiserror::Error;

/// Invalid or missing plugin arguments
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("prometheus address must not be empty")]
    EmptyAddress,

    #[error("network interface must not be empty")]
    EmptyInterface,

    #[error("time range must be a positive number of minutes, got {0}")]
    InvalidTimeRange(i64),

    #[error("query timeout must be greater than zero")]
    ZeroQueryTimeout,
}

/// The Prometheus client could not be constructed
#[derive(Debug, Error)]
pub enum ClientInitError {
    #[error("invalid prometheus address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported scheme {scheme:?} in prometheus address, expected http or https")]
    UnsupportedScheme { scheme: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Failure to construct the scoring plugin
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("invalid plugin arguments: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to create prometheus client: {0}")]
    ClientInit(#[from] ClientInitError),
}

/// A query against the metrics backend failed
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to prometheus failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("prometheus query timed out after {0:?}")]
    Timeout(Duration),

    #[error("prometheus query was cancelled")]
    Cancelled,

    #[error("prometheus returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("prometheus reported {error_type}: {message}")]
    Api { error_type: String, message: String },

    #[error("failed to decode prometheus response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("expected a vector result, got {0}")]
    UnexpectedResultType(String),

    #[error("ambiguous result, expected 1 series, got {count}")]
    AmbiguousResult { count: usize },

    #[error("invalid sample value {0:?}")]
    InvalidSample(String),
}

/// Scoring a single node failed for the current cycle
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("node name must not be empty")]
    InvalidNode,

    #[error("error getting bandwidth measure for node {node}: {source}")]
    Backend {
        node: String,
        #[source]
        source: BackendError,
    },

    #[error("scoring task for node {node} did not complete: {message}")]
    TaskFailed { node: String, message: String },
}

impl ScoringError {
    /// Name of the node the failure belongs to, if known
    pub fn node(&self) -> Option<&str> {
        match self {
            ScoringError::InvalidNode => None,
            ScoringError::Backend { node, .. } | ScoringError::TaskFailed { node, .. } => {
                Some(node)
            }
        }
    }

    /// True when the failure was caused by caller cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ScoringError::Backend {
                source: BackendError::Cancelled,
                ..
            }
        )
    }
}

/// The cross-node normalization pass could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    #[error("score {score} of node {node} overflows during normalization")]
    Overflow { node: String, score: i64 },
}
