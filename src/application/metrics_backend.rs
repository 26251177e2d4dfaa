// Port for the Prometheus-compatible metrics backend
use crate::domain::prometheus::{LabelSet, QueryResponse};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to metrics backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("metrics backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("metrics backend reported an error: {0}")]
    Api(String),

    #[error("failed to decode metrics backend response: {0}")]
    Decode(String),

    #[error("invalid metrics backend configuration: {0}")]
    Config(String),
}

/// What to do once the retry budget of an operation is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Surface the final error; the caller must know the data is unavailable.
    FailClosed,
    /// Log the final error and yield an empty result.
    FailOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOperation {
    InstantQuery,
    RangeQuery,
    LabelValues,
    Series,
}

impl BackendOperation {
    pub fn failure_policy(self) -> FailurePolicy {
        match self {
            Self::InstantQuery | Self::RangeQuery => FailurePolicy::FailClosed,
            Self::LabelValues | Self::Series => FailurePolicy::FailOpen,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InstantQuery => "instant_query",
            Self::RangeQuery => "range_query",
            Self::LabelValues => "label_values",
            Self::Series => "series",
        }
    }
}

#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Evaluate `query` at a single point in time (`time` defaults to now).
    async fn instant_query(
        &self,
        query: &str,
        time: Option<&str>,
    ) -> Result<QueryResponse, BackendError>;

    /// Evaluate `query` over `[start, end]` at a fixed `step`.
    async fn range_query(
        &self,
        query: &str,
        start: &str,
        end: &str,
        step: &str,
    ) -> Result<QueryResponse, BackendError>;

    /// Distinct values of `label`, optionally constrained by a series selector.
    async fn label_values(
        &self,
        label: &str,
        selector: Option<&str>,
    ) -> Result<Vec<String>, BackendError>;

    /// Label sets of the series matching `selector`.
    async fn series(
        &self,
        selector: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<LabelSet>, BackendError>;
}
