//! Time-series backend access
//!
//! The scorer reads bandwidth samples through the [`MetricsSource`] trait;
//! [`PrometheusClient`] is the production implementation backed by the
//! Prometheus HTTP query API.

mod client;
mod response;


pub use client::PrometheusClient;

use crate::error::BackendError;
use crate::models::BandwidthSample;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

pub use async_trait::async_trait;

/// Source of instantaneous bandwidth samples
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Evaluate `query` at `at` and return its single sample
    ///
    /// Cancelling `cancel` aborts the in-flight request with
    /// [`BackendError::Cancelled`].
    async fn instant_query(
        &self,
        query: &str,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<BandwidthSample, BackendError>;
}
