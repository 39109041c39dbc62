//! Plugin arguments

use crate::error::ConfigError;
use crate::scoring::NormalizationStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Arguments consumed when constructing the network traffic plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTrafficArgs {
    /// Prometheus endpoint, e.g. `http://prometheus.monitoring:9090`
    pub address: String,

    /// Interface whose received bytes are measured
    #[serde(default = "default_network_interface")]
    pub network_interface: String,

    /// Window summed by the bandwidth query
    #[serde(default = "default_time_range_in_minutes")]
    pub time_range_in_minutes: i64,

    /// Formula used by the normalization pass
    #[serde(default)]
    pub normalization: NormalizationStrategy,

    /// Per-request timeout for Prometheus queries
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// Upper bound on in-flight Prometheus queries, 0 means unbounded
    #[serde(default)]
    pub max_concurrent_queries: usize,
}

fn default_network_interface() -> String {
    "eth0".to_string()
}

fn default_time_range_in_minutes() -> i64 {
    5
}

fn default_query_timeout_secs() -> u64 {
    30
}

impl NetworkTrafficArgs {
    /// Arguments with defaults for everything but the Prometheus address
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            network_interface: default_network_interface(),
            time_range_in_minutes: default_time_range_in_minutes(),
            normalization: NormalizationStrategy::default(),
            query_timeout_secs: default_query_timeout_secs(),
            max_concurrent_queries: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::EmptyAddress);
        }
        if self.network_interface.is_empty() {
            return Err(ConfigError::EmptyInterface);
        }
        if self.time_range_in_minutes <= 0 || self.time_range_in_minutes.checked_mul(60).is_none()
        {
            return Err(ConfigError::InvalidTimeRange(self.time_range_in_minutes));
        }
        if self.query_timeout_secs == 0 {
            return Err(ConfigError::ZeroQueryTimeout);
        }
        Ok(())
    }

    /// Query window; only meaningful after [`validate`](Self::validate) succeeded
    pub fn time_range(&self) -> Duration {
        let minutes = self.time_range_in_minutes.max(0) as u64;
        Duration::from_secs(minutes.saturating_mul(60))
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_json() {
        let args: NetworkTrafficArgs =
            serde_json::from_str(r#"{"address": "http://prometheus:9090"}"#).unwrap();

        assert_eq!(args.network_interface, "eth0");
        assert_eq!(args.time_range_in_minutes, 5);
        assert_eq!(args.normalization, NormalizationStrategy::Legacy);
        assert_eq!(args.query_timeout(), Duration::from_secs(30));
        assert_eq!(args.max_concurrent_queries, 0);
        assert_eq!(args.time_range(), Duration::from_secs(300));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_strategy_from_json() {
        let args: NetworkTrafficArgs = serde_json::from_str(
            r#"{"address": "http://p:9090", "normalization": "rule_of_three"}"#,
        )
        .unwrap();
        assert_eq!(args.normalization, NormalizationStrategy::RuleOfThree);
    }

    #[test]
    fn test_validation_errors() {
        let mut args = NetworkTrafficArgs::new("");
        assert_eq!(args.validate(), Err(ConfigError::EmptyAddress));

        args.address = "http://prometheus:9090".to_string();
        args.network_interface.clear();
        assert_eq!(args.validate(), Err(ConfigError::EmptyInterface));

        args.network_interface = "eth0".to_string();
        args.time_range_in_minutes = 0;
        assert_eq!(args.validate(), Err(ConfigError::InvalidTimeRange(0)));

        args.time_range_in_minutes = -3;
        assert_eq!(args.validate(), Err(ConfigError::InvalidTimeRange(-3)));

        args.time_range_in_minutes = i64::MAX / 2;
        assert_eq!(
            args.validate(),
            Err(ConfigError::InvalidTimeRange(i64::MAX / 2))
        );

        args.time_range_in_minutes = 5;
        args.query_timeout_secs = 0;
        assert_eq!(args.validate(), Err(ConfigError::ZeroQueryTimeout));
    }

    #[test]
    fn test_time_range_saturates() {
        let mut args = NetworkTrafficArgs::new("http://prometheus:9090");
        args.time_range_in_minutes = i64::MAX;
        assert_eq!(args.time_range(), Duration::from_secs(u64::MAX));
    }
}
