//! Latest-sample fetch for one tracked metric

use crate::backend::MetricsBackend;
use crate::error::CollectError;
use crate::inventory::{TAG_SEPARATOR, VOLUME_MARKER};
use crate::models::{Classification, MetricSeriesDescriptor, ResultMetric, RESOURCE_ID_TAG};
use crate::tracked::{Scope, TrackedMetric};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, trace};

/// Samples requested per series; only the most recent one is used
pub const SAMPLE_LIMIT: usize = 2;

/// Default maximum sample age
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(60);

/// Timing parameters shared by every fetch of a cycle
#[derive(Debug, Clone, Copy)]
pub struct FetchWindow {
    /// Reference time captured at cycle start
    pub now: DateTime<Utc>,
    /// Samples at least this old are discarded
    pub freshness: chrono::Duration,
    /// Upper bound on the whole fetch of one metric
    pub timeout: Duration,
}

impl FetchWindow {
    pub fn new(now: DateTime<Utc>, freshness: Duration, timeout: Duration) -> Self {
        let freshness = chrono::Duration::from_std(freshness)
            .unwrap_or_else(|_| chrono::Duration::seconds(FRESHNESS_WINDOW.as_secs() as i64));
        Self {
            now,
            freshness,
            timeout,
        }
    }
}

/// Fetch the fresh latest values of `metric` from its descriptors
///
/// A failed or timed-out read discards the results of this metric only.
pub async fn fetch_metric(
    backend: &dyn MetricsBackend,
    metric: TrackedMetric,
    descriptors: &[MetricSeriesDescriptor],
    window: FetchWindow,
) -> Result<Vec<ResultMetric>, CollectError> {
    match tokio::time::timeout(window.timeout, read_fresh(backend, metric, descriptors, window))
        .await
    {
        Ok(result) => result,
        Err(_) => Err(CollectError::Fetch {
            metric,
            reason: format!("timed out after {:?}", window.timeout),
        }),
    }
}

async fn read_fresh(
    backend: &dyn MetricsBackend,
    metric: TrackedMetric,
    descriptors: &[MetricSeriesDescriptor],
    window: FetchWindow,
) -> Result<Vec<ResultMetric>, CollectError> {
    let mut results = Vec::new();

    for descriptor in descriptors
        .iter()
        .filter(|d| d.descriptor_name() == Some(metric.descriptor_name()))
    {
        let samples = backend
            .read_latest_samples(metric.kind(), &descriptor.id, SAMPLE_LIMIT)
            .await
            .map_err(|e| CollectError::Fetch {
                metric,
                reason: e.to_string(),
            })?;

        let Some(latest) = samples.into_iter().next() else {
            trace!(series = %descriptor.id, "No samples");
            continue;
        };
        if !latest.is_fresh(window.now, window.freshness) {
            trace!(series = %descriptor.id, timestamp = latest.timestamp, "Stale sample");
            continue;
        }

        let volume = match metric.scope() {
            Scope::Storage => resolve_volume(descriptor),
            Scope::Workload => None,
        };

        results.push(ResultMetric {
            kind: Classification::from_tags(&descriptor.tags),
            id: descriptor.id.clone(),
            tags: descriptor.tags.clone(),
            value: latest.value,
            volume,
        });
    }

    debug!(metric = %metric, count = results.len(), "Fetched metric");
    Ok(results)
}

/// Volume name following the `Volume:` marker, up to the next separator
pub fn volume_from_identifier(identifier: &str) -> Option<String> {
    let (_, rest) = identifier.split_once(VOLUME_MARKER)?;
    let name = rest.split(TAG_SEPARATOR).next().unwrap_or(rest);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Volume of a storage series, from its id or else its resource id tag
fn resolve_volume(descriptor: &MetricSeriesDescriptor) -> Option<String> {
    volume_from_identifier(&descriptor.id).or_else(|| {
        descriptor
            .tag(RESOURCE_ID_TAG)
            .and_then(volume_from_identifier)
    })
}
