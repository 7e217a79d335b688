//! Error taxonomy for a collection cycle

use crate::tracked::TrackedMetric;
use thiserror::Error;

/// Errors raised while collecting one scrape
///
/// Every variant except [`CollectError::Fetch`] aborts the cycle and
/// leaves only `up 0` in the output.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The service account token could not be read
    #[error("failed to read service account token: {0}")]
    Auth(String),

    /// The metrics backend client could not be constructed
    #[error("failed to build metrics backend client: {0}")]
    BackendConnect(String),

    /// The Kubernetes API rejected a list call
    #[error("inventory query failed: {0:#}")]
    Inventory(anyhow::Error),

    /// Series descriptors could not be listed
    #[error("series descriptor query failed: {0}")]
    Descriptors(#[source] BackendError),

    /// A single metric could not be read; siblings are unaffected
    #[error("fetch of {metric} failed: {reason}")]
    Fetch {
        metric: TrackedMetric,
        reason: String,
    },
}

impl CollectError {
    /// Whether the error aborts the whole cycle
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CollectError::Fetch { .. })
    }

    /// Stable label value for failure counters
    pub fn class(&self) -> &'static str {
        match self {
            CollectError::Auth(_) => "auth",
            CollectError::BackendConnect(_) => "backend_connect",
            CollectError::Inventory(_) => "inventory",
            CollectError::Descriptors(_) => "descriptors",
            CollectError::Fetch { .. } => "fetch",
        }
    }
}

/// Failures talking to the Hawkular Metrics REST API
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid backend url: {0}")]
    Url(String),
}
