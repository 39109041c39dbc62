//! Extender configuration

use anyhow::{Context, Result};
use netscore_lib::NetworkTrafficArgs;
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "NETSCORE_CONFIG";

/// Extender configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtenderConfig {
    /// Port serving the extender, health and metrics endpoints
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Network traffic plugin arguments
    pub plugin: NetworkTrafficArgs,
}

fn default_listen_port() -> u16 {
    8888
}

impl ExtenderConfig {
    /// Load configuration from the optional file and `NETSCORE_*` variables
    ///
    /// Nested keys use `__`, e.g. `NETSCORE_PLUGIN__ADDRESS`.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).ok();
        let environment = config::Environment::with_prefix("NETSCORE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        Self::from_sources(path.as_deref().map(Path::new), environment)
    }

    /// Merge `file` (if any) with `environment` and validate the result
    pub fn from_sources(file: Option<&Path>, environment: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        let config: ExtenderConfig = builder
            .add_source(environment)
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Invalid extender configuration")?;

        config
            .plugin
            .validate()
            .context("Invalid network traffic plugin arguments")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env() -> config::Environment {
        config::Environment::with_prefix("NETSCORE_TEST_UNSET").separator("__")
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
listen_port = 9999

[plugin]
address = "http://prometheus.monitoring:9090"
network_interface = "ens5"
time_range_in_minutes = 10
normalization = "rule_of_three"
"#,
        );

        let config = ExtenderConfig::from_sources(Some(file.path()), no_env()).unwrap();
        assert_eq!(config.listen_port, 9999);
        assert_eq!(config.plugin.network_interface, "ens5");
        assert_eq!(config.plugin.time_range_in_minutes, 10);
        assert_eq!(
            config.plugin.normalization,
            netscore_lib::NormalizationStrategy::RuleOfThree
        );
    }

    #[test]
    fn test_defaults_applied() {
        let file = write_config(
            r#"
[plugin]
address = "http://prometheus:9090"
"#,
        );

        let config = ExtenderConfig::from_sources(Some(file.path()), no_env()).unwrap();
        assert_eq!(config.listen_port, 8888);
        assert_eq!(config.plugin.network_interface, "eth0");
        assert_eq!(config.plugin.time_range_in_minutes, 5);
    }

    #[test]
    fn test_missing_plugin_section_fails() {
        let file = write_config("listen_port = 8080\n");
        assert!(ExtenderConfig::from_sources(Some(file.path()), no_env()).is_err());
    }

    #[test]
    fn test_invalid_time_range_fails() {
        let file = write_config(
            r#"
[plugin]
address = "http://prometheus:9090"
time_range_in_minutes = 0
"#,
        );
        let err = ExtenderConfig::from_sources(Some(file.path()), no_env()).unwrap_err();
        assert!(format!("{:#}", err).contains("time range"));
    }
}
