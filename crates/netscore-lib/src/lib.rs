//! Network traffic node scoring
//!
//! This crate provides the core functionality for:
//! - Building bandwidth queries for Prometheus
//! - Fetching one bandwidth sample per candidate node
//! - Scoring and normalizing nodes so quieter nodes rank higher
//! - Health checks and observability

pub mod backend;
pub mod config;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod query;
pub mod scoring;

pub use backend::{MetricsSource, PrometheusClient};
pub use config::NetworkTrafficArgs;
pub use error::{
    BackendError, ClientInitError, ConfigError, NormalizationError, PluginError, ScoringError,
};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{Diagnostics, NoopDiagnostics, PluginMetrics, StructuredLogger};
pub use scoring::{
    run_cycle, CycleOutcome, NetworkTraffic, NodeFailure, NormalizationStrategy, ScorePlugin,
    PLUGIN_NAME,
};

pub use tokio_util::sync::CancellationToken;
