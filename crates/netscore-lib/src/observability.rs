//! Observability infrastructure for the network traffic scorer
//!
//! Provides:
//! - The [`Diagnostics`] side channel injected into the client and plugin
//! - Prometheus metrics (query latency, score outcomes, backend warnings)
//! - Structured JSON logging with tracing

use crate::error::ScoringError;
use crate::models::{BandwidthSample, NodeScore};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

/// Side channel receiving the scorer's diagnostic events
///
/// Every method defaults to a no-op so implementations only override the
/// events they care about.
pub trait Diagnostics: Send + Sync {
    /// Prometheus answered with non-fatal warnings
    fn backend_warnings(&self, _query: &str, _warnings: &[String]) {}

    /// A Prometheus round trip finished
    fn query_completed(&self, _elapsed: Duration, _success: bool) {}

    /// A node produced a raw score
    fn node_scored(&self, _node: &str, _sample: &BandwidthSample, _score: i64) {}

    /// A node could not be scored this cycle
    fn node_score_failed(&self, _node: &str, _error: &ScoringError) {}

    /// The normalization pass produced the final batch
    fn scores_normalized(&self, _scores: &[NodeScore]) {}
}

/// Diagnostics sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {}

/// Default histogram buckets for query latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PluginMetricsInner> = OnceLock::new();

struct PluginMetricsInner {
    query_latency_seconds: Histogram,
    query_failures: IntCounter,
    node_scores: IntCounterVec,
    backend_warnings: IntCounter,
    normalizations: IntCounter,
}

impl PluginMetricsInner {
    fn new() -> Self {
        Self {
            query_latency_seconds: register_histogram!(
                "netscore_query_latency_seconds",
                "Time spent waiting for Prometheus bandwidth queries",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register query_latency_seconds"),

            query_failures: register_int_counter!(
                "netscore_query_failures_total",
                "Prometheus queries that failed or returned an unusable result"
            )
            .expect("Failed to register query_failures"),

            node_scores: register_int_counter_vec!(
                "netscore_node_scores_total",
                "Per-node score evaluations by outcome",
                &["outcome"]
            )
            .expect("Failed to register node_scores"),

            backend_warnings: register_int_counter!(
                "netscore_backend_warnings_total",
                "Warnings returned by Prometheus alongside query results"
            )
            .expect("Failed to register backend_warnings"),

            normalizations: register_int_counter!(
                "netscore_normalizations_total",
                "Completed normalization passes"
            )
            .expect("Failed to register normalizations"),
        }
    }
}

/// Plugin metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying collectors.
#[derive(Clone)]
pub struct PluginMetrics {
    _private: (),
}

impl Default for PluginMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginMetrics {
    /// Create a new metrics handle (registers global metrics on first call)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PluginMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PluginMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_query(&self, elapsed: Duration, success: bool) {
        self.inner()
            .query_latency_seconds
            .observe(elapsed.as_secs_f64());
        if !success {
            self.inner().query_failures.inc();
        }
    }

    pub fn inc_scored(&self) {
        self.inner().node_scores.with_label_values(&["success"]).inc();
    }

    pub fn inc_score_failures(&self) {
        self.inner().node_scores.with_label_values(&["failure"]).inc();
    }

    pub fn add_backend_warnings(&self, count: usize) {
        self.inner().backend_warnings.inc_by(count as u64);
    }

    pub fn inc_normalizations(&self) {
        self.inner().normalizations.inc();
    }

    pub fn scored_count(&self) -> u64 {
        self.inner().node_scores.with_label_values(&["success"]).get()
    }

    pub fn score_failure_count(&self) -> u64 {
        self.inner().node_scores.with_label_values(&["failure"]).get()
    }
}

/// Structured logger for scoring events
///
/// Emits one JSON-friendly tracing event per diagnostic and, when attached,
/// keeps [`PluginMetrics`] in step.
#[derive(Clone)]
pub struct StructuredLogger {
    plugin: String,
    metrics: Option<PluginMetrics>,
}

impl StructuredLogger {
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: PluginMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Log plugin startup
    pub fn log_startup(&self, version: &str, address: &str, interface: &str) {
        info!(
            event = "plugin_started",
            plugin = %self.plugin,
            version = %version,
            prometheus = %address,
            interface = %interface,
            "Network traffic scorer started"
        );
    }

    /// Log plugin shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "plugin_shutdown",
            plugin = %self.plugin,
            reason = %reason,
            "Network traffic scorer shutting down"
        );
    }
}

impl Diagnostics for StructuredLogger {
    fn backend_warnings(&self, query: &str, warnings: &[String]) {
        warn!(
            event = "backend_warnings",
            plugin = %self.plugin,
            query = %query,
            warnings = ?warnings,
            "Prometheus returned warnings"
        );
        if let Some(metrics) = &self.metrics {
            metrics.add_backend_warnings(warnings.len());
        }
    }

    fn query_completed(&self, elapsed: Duration, success: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.observe_query(elapsed, success);
        }
    }

    fn node_scored(&self, node: &str, sample: &BandwidthSample, score: i64) {
        info!(
            event = "node_scored",
            plugin = %self.plugin,
            node = %node,
            bandwidth = sample.value,
            sampled_at = %sample.timestamp,
            score = score,
            "Node bandwidth measured"
        );
        if let Some(metrics) = &self.metrics {
            metrics.inc_scored();
        }
    }

    fn node_score_failed(&self, node: &str, error: &ScoringError) {
        warn!(
            event = "node_score_failed",
            plugin = %self.plugin,
            node = %node,
            error = %error,
            "Failed to score node"
        );
        if let Some(metrics) = &self.metrics {
            metrics.inc_score_failures();
        }
    }

    fn scores_normalized(&self, scores: &[NodeScore]) {
        info!(
            event = "scores_normalized",
            plugin = %self.plugin,
            nodes = scores.len(),
            scores = ?scores,
            "Nodes final score"
        );
        if let Some(metrics) = &self.metrics {
            metrics.inc_normalizations();
        }
    }
}
