//! Hawkular Metrics backend
//!
//! The collector talks to the backend through two traits: a
//! [`BackendConnector`] that authenticates and builds a client at the start
//! of every cycle, and the [`MetricsBackend`] it returns.

pub mod auth;
mod hawkular;

pub use hawkular::{HawkularClient, HawkularConnector, HawkularSettings};

use crate::error::{BackendError, CollectError};
use crate::inventory::TagFilter;
use crate::models::{MetricSeriesDescriptor, Sample};
use crate::tracked::MetricKind;
use async_trait::async_trait;
use std::sync::Arc;

/// Read access to series descriptors and their samples
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// List the series descriptors matching `filter`
    async fn list_series_descriptors(
        &self,
        filter: &TagFilter,
    ) -> Result<Vec<MetricSeriesDescriptor>, BackendError>;

    /// Read up to `limit` samples of a series, most recent first
    async fn read_latest_samples(
        &self,
        kind: MetricKind,
        series_id: &str,
        limit: usize,
    ) -> Result<Vec<Sample>, BackendError>;
}

/// Produces an authenticated backend client for one cycle
#[async_trait]
pub trait BackendConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn MetricsBackend>, CollectError>;
}
