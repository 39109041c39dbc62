//! HTTP client for the Prometheus instant query API

use super::response::ApiResponse;
use super::{async_trait, MetricsSource};
use crate::config::NetworkTrafficArgs;
use crate::error::{BackendError, ClientInitError};
use crate::models::BandwidthSample;
use crate::observability::Diagnostics;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

const QUERY_PATH: &str = "api/v1/query";

/// Prometheus query client
///
/// Holds only immutable state after construction, so a single instance can
/// serve concurrent queries for every node of a cycle.
pub struct PrometheusClient {
    http: Client,
    query_url: Url,
    timeout: Duration,
    limiter: Option<Semaphore>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl PrometheusClient {
    /// Create a client bound to the Prometheus server at `address`
    ///
    /// `max_concurrent_queries` of 0 leaves concurrency unbounded.
    pub fn new(
        address: &str,
        timeout: Duration,
        max_concurrent_queries: usize,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self, ClientInitError> {
        let mut base_url = Url::parse(address).map_err(|source| ClientInitError::InvalidAddress {
            address: address.to_string(),
            source,
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientInitError::UnsupportedScheme {
                scheme: base_url.scheme().to_string(),
            });
        }

        // Keep any path prefix (e.g. behind a proxy) when joining the API path
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let query_url = base_url
            .join(QUERY_PATH)
            .map_err(|source| ClientInitError::InvalidAddress {
                address: address.to_string(),
                source,
            })?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientInitError::HttpClient)?;

        let limiter = (max_concurrent_queries > 0).then(|| Semaphore::new(max_concurrent_queries));

        Ok(Self {
            http,
            query_url,
            timeout,
            limiter,
            diagnostics,
        })
    }

    /// Create a client from validated plugin arguments
    pub fn from_args(
        args: &NetworkTrafficArgs,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self, ClientInitError> {
        Self::new(
            &args.address,
            args.query_timeout(),
            args.max_concurrent_queries,
            diagnostics,
        )
    }

    /// Full URL of the instant query endpoint
    pub fn query_url(&self) -> &Url {
        &self.query_url
    }

    /// Evaluate `query` at `at`, expecting exactly one series
    pub async fn query(
        &self,
        query: &str,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<BandwidthSample, BackendError> {
        let started = Instant::now();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BackendError::Cancelled),
            result = self.execute(query, at) => result,
        };

        self.diagnostics
            .query_completed(started.elapsed(), result.is_ok());
        result
    }

    async fn execute(
        &self,
        query: &str,
        at: DateTime<Utc>,
    ) -> Result<BandwidthSample, BackendError> {
        let _permit = match &self.limiter {
            Some(limiter) => Some(
                limiter
                    .acquire()
                    .await
                    .map_err(|_| BackendError::Cancelled)?,
            ),
            None => None,
        };

        let time = format!("{:.3}", at.timestamp_millis() as f64 / 1000.0);
        debug!(query = %query, time = %time, "Querying prometheus");

        let response = self
            .http
            .get(self.query_url.clone())
            .query(&[("query", query), ("time", time.as_str())])
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| self.transport_error(err))?;

        let envelope: ApiResponse = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(BackendError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
            Err(err) => return Err(BackendError::Decode(err)),
        };

        if !envelope.warnings.is_empty() {
            self.diagnostics.backend_warnings(query, &envelope.warnings);
        }

        if envelope.is_error() {
            return Err(envelope.into_api_error());
        }
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        envelope.into_single_sample()
    }

    fn transport_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout)
        } else {
            BackendError::Transport(err)
        }
    }
}

#[async_trait]
impl MetricsSource for PrometheusClient {
    async fn instant_query(
        &self,
        query: &str,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<BandwidthSample, BackendError> {
        self.query(query, at, cancel).await
    }
}
