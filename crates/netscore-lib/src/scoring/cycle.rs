//! Scoring cycle driver
//!
//! Scores every candidate node concurrently, then runs the normalization pass
//! exactly once over the nodes that produced a raw score.

use super::ScorePlugin;
use crate::error::{NormalizationError, ScoringError};
use crate::models::{NodeScore, ScoreBatch, MIN_NODE_SCORE};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A node that could not be scored this cycle
#[derive(Debug)]
pub struct NodeFailure {
    pub node_name: String,
    pub error: ScoringError,
}

/// Result of one scoring cycle
#[derive(Debug)]
pub struct CycleOutcome {
    /// Normalized scores of successfully scored nodes, in input order
    pub scores: ScoreBatch,
    /// Raw scores aligned with `scores`
    pub raw_scores: Vec<i64>,
    /// Nodes that failed, in input order
    pub failures: Vec<NodeFailure>,
    nodes: Vec<String>,
    slots: Vec<Option<usize>>,
}

impl CycleOutcome {
    /// One entry per input node, in input order
    ///
    /// Failed nodes are penalised with [`MIN_NODE_SCORE`] for this cycle only.
    pub fn host_priorities(&self) -> Vec<NodeScore> {
        self.nodes
            .iter()
            .zip(&self.slots)
            .map(|(node, slot)| match slot {
                Some(index) => self.scores[*index].clone(),
                None => NodeScore::new(node.clone(), MIN_NODE_SCORE),
            })
            .collect()
    }

    pub fn all_failed(&self) -> bool {
        !self.nodes.is_empty() && self.scores.is_empty()
    }
}

/// Run one scoring cycle of `plugin` over `nodes`
pub async fn run_cycle(
    plugin: Arc<dyn ScorePlugin>,
    nodes: &[String],
    cancel: &CancellationToken,
) -> Result<CycleOutcome, NormalizationError> {
    let handles: Vec<_> = nodes
        .iter()
        .map(|node| {
            let plugin = plugin.clone();
            let node = node.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { plugin.score(&node, &cancel).await })
        })
        .collect();

    let mut scores = ScoreBatch::with_capacity(nodes.len());
    let mut failures = Vec::new();
    let mut slots = Vec::with_capacity(nodes.len());

    for (node, handle) in nodes.iter().zip(handles) {
        let result = match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(ScoringError::TaskFailed {
                node: node.clone(),
                message: join_err.to_string(),
            }),
        };

        match result {
            Ok(score) => {
                slots.push(Some(scores.len()));
                scores.push(NodeScore::new(node.clone(), score));
            }
            Err(error) => {
                slots.push(None);
                failures.push(NodeFailure {
                    node_name: node.clone(),
                    error,
                });
            }
        }
    }

    let raw_scores = scores.iter().map(|node| node.score).collect();
    plugin.normalize_score(&mut scores)?;

    debug!(
        plugin = plugin.name(),
        scored = scores.len(),
        failed = failures.len(),
        "Scoring cycle finished"
    );

    Ok(CycleOutcome {
        scores,
        raw_scores,
        failures,
        nodes: nodes.to_vec(),
        slots,
    })
}
