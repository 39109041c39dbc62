//! Prometheus HTTP API response envelope

use crate::error::BackendError;
use crate::models::BandwidthSample;
use chrono::DateTime;
use serde::Deserialize;

/// Envelope returned by `/api/v1/query`
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<QueryData>,
    #[serde(default, rename = "errorType")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ApiResponse {
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }

    pub fn into_api_error(self) -> BackendError {
        BackendError::Api {
            error_type: self.error_type.unwrap_or_else(|| "unknown".to_string()),
            message: self.error.unwrap_or_default(),
        }
    }

    /// Extract the single sample of a one-series vector result
    pub fn into_single_sample(self) -> Result<BandwidthSample, BackendError> {
        if self.is_error() {
            return Err(self.into_api_error());
        }

        match self.data {
            Some(QueryData::Vector(mut series)) => {
                if series.len() != 1 {
                    return Err(BackendError::AmbiguousResult {
                        count: series.len(),
                    });
                }
                series.remove(0).value.to_sample()
            }
            Some(other) => Err(BackendError::UnexpectedResultType(
                other.result_type().to_string(),
            )),
            None => Err(BackendError::UnexpectedResultType("none".to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub(crate) enum QueryData {
    Vector(Vec<VectorSeries>),
    Scalar(SamplePair),
    String(SamplePair),
    Matrix(Vec<serde_json::Value>),
}

impl QueryData {
    fn result_type(&self) -> &'static str {
        match self {
            QueryData::Vector(_) => "vector",
            QueryData::Scalar(_) => "scalar",
            QueryData::String(_) => "string",
            QueryData::Matrix(_) => "matrix",
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VectorSeries {
    pub value: SamplePair,
}

/// `[<unix seconds>, "<value>"]`
#[derive(Debug, Deserialize)]
pub(crate) struct SamplePair(pub f64, pub String);

impl SamplePair {
    fn to_sample(&self) -> Result<BandwidthSample, BackendError> {
        let value: f64 = self
            .1
            .parse()
            .map_err(|_| BackendError::InvalidSample(self.1.clone()))?;
        if !value.is_finite() {
            return Err(BackendError::InvalidSample(self.1.clone()));
        }

        let timestamp = DateTime::from_timestamp_millis((self.0 * 1000.0).round() as i64)
            .ok_or_else(|| BackendError::InvalidSample(format!("timestamp {}", self.0)))?;

        Ok(BandwidthSample { value, timestamp })
    }
}
