//! Cross-node score normalization
//!
//! Raw scores are received-byte sums, so a larger value means a busier node.
//! Normalization rescales the batch against its maximum and inverts it so the
//! least loaded node ends up with the highest score.

use crate::error::NormalizationError;
use crate::models::{NodeScore, MAX_NODE_SCORE, MIN_NODE_SCORE};
use serde::{Deserialize, Serialize};

/// Formula applied by the normalization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationStrategy {
    /// `MAX - (raw - MAX / highest)` with integer division
    ///
    /// Unbounded below: nodes far above `MAX` bytes get negative scores.
    #[default]
    Legacy,
    /// `MAX - raw * MAX / highest`, clamped to `[MIN, MAX]`
    RuleOfThree,
}

impl NormalizationStrategy {
    /// Rewrite `scores` in place, preserving order and length
    ///
    /// An empty batch is left untouched. When the highest raw score is zero
    /// every node gets [`MAX_NODE_SCORE`]. On error the batch is not modified.
    pub fn normalize(self, scores: &mut [NodeScore]) -> Result<(), NormalizationError> {
        if scores.is_empty() {
            return Ok(());
        }

        let highest = scores.iter().map(|node| node.score).fold(0, i64::max);
        if highest == 0 {
            for node in scores.iter_mut() {
                node.score = MAX_NODE_SCORE;
            }
            return Ok(());
        }

        let normalized = match self {
            NormalizationStrategy::Legacy => legacy(scores, highest)?,
            NormalizationStrategy::RuleOfThree => rule_of_three(scores, highest),
        };

        for (node, score) in scores.iter_mut().zip(normalized) {
            node.score = score;
        }
        Ok(())
    }
}

fn legacy(scores: &[NodeScore], highest: i64) -> Result<Vec<i64>, NormalizationError> {
    let offset = MAX_NODE_SCORE / highest;
    scores
        .iter()
        .map(|node| {
            node.score
                .checked_sub(offset)
                .and_then(|shifted| MAX_NODE_SCORE.checked_sub(shifted))
                .ok_or_else(|| NormalizationError::Overflow {
                    node: node.node_name.clone(),
                    score: node.score,
                })
        })
        .collect()
}

fn rule_of_three(scores: &[NodeScore], highest: i64) -> Vec<i64> {
    let max = i128::from(MAX_NODE_SCORE);
    scores
        .iter()
        .map(|node| {
            let relative = i128::from(node.score) * max / i128::from(highest);
            (max - relative).clamp(i128::from(MIN_NODE_SCORE), max) as i64
        })
        .collect()
}
