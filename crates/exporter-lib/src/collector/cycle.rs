//! One scrape's collection cycle
//!
//! Resolves the inventory, lists the two descriptor sets and runs the ten
//! metric fetches concurrently under a shared scrape deadline.

use super::fetch::{fetch_metric, FetchWindow, FRESHNESS_WINDOW};
use crate::backend::{BackendConnector, MetricsBackend};
use crate::error::CollectError;
use crate::inventory::{Inventory, ScrapeFilters, TagFilter};
use crate::models::{MetricSeriesDescriptor, ResultMetric};
use crate::tracked::{Scope, TrackedMetric};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Configuration of the collection cycle
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    /// Namespace whose pods are exported
    pub namespace: String,
    /// Maximum sample age (default: 60 seconds)
    pub freshness_window: Duration,
    /// Deadline of a single metric fetch (default: 10 seconds)
    pub fetch_timeout: Duration,
    /// Deadline of all ten fetches together (default: 30 seconds)
    pub scrape_timeout: Duration,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            freshness_window: FRESHNESS_WINDOW,
            fetch_timeout: Duration::from_secs(10),
            scrape_timeout: Duration::from_secs(30),
        }
    }
}

/// Results of a cycle that reached the fetch stage
#[derive(Debug, Default)]
pub struct CycleOutcome {
    /// Fresh values, grouped by metric in [`TrackedMetric::ALL`] order
    pub results: Vec<ResultMetric>,
    /// Metrics whose fetch failed, timed out or was cancelled
    pub failed_metrics: Vec<TrackedMetric>,
}

/// Stateless collector; every call to [`Collector::collect`] starts over
pub struct Collector {
    inventory: Arc<dyn Inventory>,
    connector: Arc<dyn BackendConnector>,
    settings: CollectorSettings,
}

impl Collector {
    pub fn new(
        inventory: Arc<dyn Inventory>,
        connector: Arc<dyn BackendConnector>,
        settings: CollectorSettings,
    ) -> Self {
        Self {
            inventory,
            connector,
            settings,
        }
    }

    /// Run one collection cycle
    ///
    /// Freshness is judged against the time the cycle started.
    pub async fn collect(&self) -> Result<CycleOutcome, CollectError> {
        let now = Utc::now();
        let backend = self.connector.connect().await?;

        let namespace = self.settings.namespace.as_str();
        let workloads = self
            .inventory
            .list_workloads(namespace)
            .await
            .map_err(CollectError::Inventory)?;
        let claims = self
            .inventory
            .list_storage_claims(namespace)
            .await
            .map_err(CollectError::Inventory)?;

        let filters = ScrapeFilters::build(namespace, &workloads, &claims);
        debug!(
            pods = %filters.workload.to_query(),
            volumes = %filters.storage.to_query(),
            "Built tag filters"
        );

        let workload_descriptors = list_descriptors(backend.as_ref(), &filters.workload).await?;
        let storage_descriptors = list_descriptors(backend.as_ref(), &filters.storage).await?;
        info!(
            workloads = workloads.len(),
            claims = claims.len(),
            workload_descriptors = workload_descriptors.len(),
            storage_descriptors = storage_descriptors.len(),
            "Resolved inventory"
        );

        Ok(self
            .fetch_all(backend, now, workload_descriptors, storage_descriptors)
            .await)
    }

    /// Fan out one fetch per tracked metric and join them all
    async fn fetch_all(
        &self,
        backend: Arc<dyn MetricsBackend>,
        now: DateTime<Utc>,
        workload_descriptors: Vec<MetricSeriesDescriptor>,
        storage_descriptors: Vec<MetricSeriesDescriptor>,
    ) -> CycleOutcome {
        let window = FetchWindow::new(
            now,
            self.settings.freshness_window,
            self.settings.fetch_timeout,
        );
        let workload_descriptors = Arc::new(workload_descriptors);
        let storage_descriptors = Arc::new(storage_descriptors);

        let mut tasks = JoinSet::new();
        for (slot, metric) in TrackedMetric::ALL.into_iter().enumerate() {
            let backend = backend.clone();
            let descriptors = match metric.scope() {
                Scope::Workload => workload_descriptors.clone(),
                Scope::Storage => storage_descriptors.clone(),
            };
            tasks.spawn(async move {
                let result = fetch_metric(backend.as_ref(), metric, &descriptors, window).await;
                (slot, result)
            });
        }

        let mut slots: Vec<Option<Result<Vec<ResultMetric>, CollectError>>> =
            TrackedMetric::ALL.iter().map(|_| None).collect();

        let joined = tokio::time::timeout(self.settings.scrape_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((slot, result)) => slots[slot] = Some(result),
                    Err(e) => warn!(error = %e, "Metric fetch task failed"),
                }
            }
        })
        .await;

        if joined.is_err() {
            warn!(
                timeout_secs = self.settings.scrape_timeout.as_secs(),
                pending = tasks.len(),
                "Scrape deadline exceeded, cancelling in-flight fetches"
            );
            tasks.abort_all();
        }

        let mut outcome = CycleOutcome::default();
        for (metric, slot) in TrackedMetric::ALL.into_iter().zip(slots) {
            match slot {
                Some(Ok(results)) => outcome.results.extend(results),
                Some(Err(e)) => {
                    warn!(metric = %metric, error = %e, "Metric fetch failed");
                    outcome.failed_metrics.push(metric);
                }
                None => outcome.failed_metrics.push(metric),
            }
        }

        outcome
    }
}

/// List descriptors, skipping filters that cannot match any series
async fn list_descriptors(
    backend: &dyn MetricsBackend,
    filter: &TagFilter,
) -> Result<Vec<MetricSeriesDescriptor>, CollectError> {
    if filter.is_unsatisfiable() {
        debug!(tags = %filter.to_query(), "Empty selector, skipping descriptor query");
        return Ok(Vec::new());
    }

    backend
        .list_series_descriptors(filter)
        .await
        .map_err(CollectError::Descriptors)
}
