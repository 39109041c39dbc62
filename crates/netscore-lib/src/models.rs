//! Core data models for the network traffic scorer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound of the final score range expected by the scheduler
pub const MAX_NODE_SCORE: i64 = 100;

/// Lower bound of the final score range expected by the scheduler
pub const MIN_NODE_SCORE: i64 = 0;

/// Received bytes on one interface over the query window, as reported by Prometheus
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandwidthSample {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl BandwidthSample {
    /// Raw score for this sample, truncating the fractional byte count
    pub fn raw_score(&self) -> i64 {
        self.value as i64
    }
}

/// Score of a single candidate node within one scheduling cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeScore {
    pub node_name: String,
    pub score: i64,
}

impl NodeScore {
    pub fn new(node_name: impl Into<String>, score: i64) -> Self {
        Self {
            node_name: node_name.into(),
            score,
        }
    }
}

/// Ordered scores of every node evaluated in one scheduling cycle
pub type ScoreBatch = Vec<NodeScore>;
