//! Node scoring
//!
//! This module provides:
//! - The [`ScorePlugin`] contract consumed by scheduler adapters
//! - The bandwidth-based [`NetworkTraffic`] plugin
//! - Cross-node normalization strategies
//! - A concurrent scoring cycle driver

mod cycle;
mod normalize;
mod plugin;

#[cfg(test)]
mod tests;

pub use cycle::{run_cycle, CycleOutcome, NodeFailure};
pub use normalize::NormalizationStrategy;
pub use plugin::{NetworkTraffic, PLUGIN_NAME};

use crate::error::{NormalizationError, ScoringError};
use crate::models::NodeScore;
use tokio_util::sync::CancellationToken;

pub use async_trait::async_trait;

/// Scoring extension point of the scheduler
///
/// `score` is called once per candidate node, possibly concurrently;
/// `normalize_score` is called once per cycle after every `score` call
/// returned.
#[async_trait]
pub trait ScorePlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Raw score of a single node
    async fn score(&self, node_name: &str, cancel: &CancellationToken)
        -> Result<i64, ScoringError>;

    /// Rescale the cycle's raw scores in place
    fn normalize_score(&self, scores: &mut [NodeScore]) -> Result<(), NormalizationError>;
}
