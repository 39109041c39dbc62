//! HTTP API: scheduler extender prioritize verb, health checks and metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use netscore_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    observability::PluginMetrics,
    run_cycle, CancellationToken, ScorePlugin,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub plugin: Arc<dyn ScorePlugin>,
    pub health_registry: HealthRegistry,
    pub metrics: PluginMetrics,
    /// Cancelled on shutdown; every cycle runs on a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        plugin: Arc<dyn ScorePlugin>,
        health_registry: HealthRegistry,
        metrics: PluginMetrics,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            plugin,
            health_registry,
            metrics,
            shutdown,
        }
    }
}

/// Arguments sent by the scheduler to the prioritize verb
#[derive(Debug, Default, Deserialize)]
pub struct ExtenderArgs {
    #[serde(default)]
    pub nodes: Option<NodeList>,
    #[serde(default, rename = "nodenames")]
    pub node_names: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NodeList {
    #[serde(default)]
    pub items: Vec<Node>,
}

#[derive(Debug, Deserialize)]
pub struct Node {
    pub metadata: NodeMetadata,
}

#[derive(Debug, Deserialize)]
pub struct NodeMetadata {
    #[serde(default)]
    pub name: Option<String>,
}

impl ExtenderArgs {
    /// Candidate node names, preferring full node objects over bare names
    pub fn candidate_nodes(self) -> Vec<String> {
        match self.nodes {
            Some(list) if !list.items.is_empty() => list
                .items
                .into_iter()
                .filter_map(|node| node.metadata.name)
                .collect(),
            _ => self.node_names.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPriority {
    pub host: String,
    pub score: i64,
}

/// Score and normalize the candidate nodes of one pod
async fn prioritize(
    State(state): State<Arc<AppState>>,
    Json(args): Json<ExtenderArgs>,
) -> Result<Json<Vec<HostPriority>>, (StatusCode, String)> {
    let nodes = args.candidate_nodes();

    // Aborts in-flight queries when the scheduler drops the request
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    let outcome = match run_cycle(state.plugin.clone(), &nodes, &cancel).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(error = %err, "Normalization failed");
            state
                .health_registry
                .record_normalization_failure(err.to_string())
                .await;
            return Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string()));
        }
    };

    state
        .health_registry
        .record_cycle(outcome.scores.len(), outcome.failures.len())
        .await;

    for failure in &outcome.failures {
        warn!(node = %failure.node_name, error = %failure.error, "Node penalised for this cycle");
    }

    let priorities: Vec<HostPriority> = outcome
        .host_priorities()
        .into_iter()
        .map(|node| HostPriority {
            host: node.node_name,
            score: node.score,
        })
        .collect();

    info!(
        nodes = priorities.len(),
        failed = outcome.failures.len(),
        "Prioritized nodes"
    );
    Ok(Json(priorities))
}

/// Health check response - 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            err.to_string().into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Register the components reported by `/healthz`
pub async fn register_components(registry: &HealthRegistry) {
    registry.register(components::METRICS_BACKEND).await;
    registry.register(components::SCORER).await;
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/prioritize", post(prioritize))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve the API until `state.shutdown` is cancelled
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let shutdown = state.shutdown.clone();
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting extender server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
