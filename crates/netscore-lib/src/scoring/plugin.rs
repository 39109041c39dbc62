//! Network traffic score plugin
//!
//! Favours nodes with less received network traffic: the raw score is the
//! number of bytes a node received on the configured interface over the
//! configured window, and normalization inverts it.

use super::{async_trait, NormalizationStrategy, ScorePlugin};
use crate::backend::{MetricsSource, PrometheusClient};
use crate::config::NetworkTrafficArgs;
use crate::error::{ConfigError, NormalizationError, PluginError, ScoringError};
use crate::models::{BandwidthSample, NodeScore};
use crate::observability::Diagnostics;
use crate::query::QueryParameters;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const PLUGIN_NAME: &str = "NetworkTraffic";

/// Bandwidth-based node scorer
pub struct NetworkTraffic {
    source: Arc<dyn MetricsSource>,
    network_interface: String,
    time_range: Duration,
    normalization: NormalizationStrategy,
    diagnostics: Arc<dyn Diagnostics>,
}

impl NetworkTraffic {
    /// Build the plugin and its Prometheus client from `args`
    ///
    /// Any failure here is fatal for the hosting process.
    pub fn new(
        args: &NetworkTrafficArgs,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self, PluginError> {
        args.validate()?;
        let client = PrometheusClient::from_args(args, diagnostics.clone())?;
        Ok(Self::with_source(args, Arc::new(client), diagnostics)?)
    }

    /// Build the plugin on top of an existing metrics source
    pub fn with_source(
        args: &NetworkTrafficArgs,
        source: Arc<dyn MetricsSource>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self, ConfigError> {
        args.validate()?;
        Ok(Self {
            source,
            network_interface: args.network_interface.clone(),
            time_range: args.time_range(),
            normalization: args.normalization,
            diagnostics,
        })
    }

    pub fn network_interface(&self) -> &str {
        &self.network_interface
    }

    pub fn time_range(&self) -> Duration {
        self.time_range
    }

    pub fn normalization(&self) -> NormalizationStrategy {
        self.normalization
    }

    /// PromQL sent for `node_name`
    pub fn query_for(&self, node_name: &str) -> String {
        QueryParameters::new(node_name, &self.network_interface, self.time_range).to_query()
    }

    /// Fetch the current bandwidth sample of a node
    pub async fn measure(
        &self,
        node_name: &str,
        cancel: &CancellationToken,
    ) -> Result<BandwidthSample, ScoringError> {
        if node_name.is_empty() {
            return Err(ScoringError::InvalidNode);
        }

        let query = self.query_for(node_name);
        self.source
            .instant_query(&query, Utc::now(), cancel)
            .await
            .map_err(|source| ScoringError::Backend {
                node: node_name.to_string(),
                source,
            })
    }
}

#[async_trait]
impl ScorePlugin for NetworkTraffic {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    async fn score(
        &self,
        node_name: &str,
        cancel: &CancellationToken,
    ) -> Result<i64, ScoringError> {
        match self.measure(node_name, cancel).await {
            Ok(sample) => {
                let score = sample.raw_score();
                self.diagnostics.node_scored(node_name, &sample, score);
                Ok(score)
            }
            Err(err) => {
                self.diagnostics.node_score_failed(node_name, &err);
                Err(err)
            }
        }
    }

    fn normalize_score(&self, scores: &mut [NodeScore]) -> Result<(), NormalizationError> {
        self.normalization.normalize(scores)?;
        self.diagnostics.scores_normalized(scores);
        Ok(())
    }
}
