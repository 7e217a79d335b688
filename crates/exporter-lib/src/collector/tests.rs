//! Collection cycle tests
//!
//! These tests drive the full cycle against an in-memory inventory and
//! metrics backend, without a Kubernetes cluster or Hawkular server.

use super::*;
use crate::backend::{BackendConnector, MetricsBackend};
use crate::error::{BackendError, CollectError};
use crate::inventory::{Inventory, TagFilter};
use crate::models::*;
use crate::tracked::{MetricKind, TrackedMetric};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory Hawkular
#[derive(Default)]
struct MockBackend {
    workload_descriptors: Vec<MetricSeriesDescriptor>,
    storage_descriptors: Vec<MetricSeriesDescriptor>,
    samples: HashMap<String, Vec<Sample>>,
    failing_series: HashSet<String>,
    slow_series: HashMap<String, Duration>,
    fail_descriptors: bool,
    descriptor_queries: Mutex<Vec<TagFilter>>,
    reads: AtomicUsize,
}

impl MockBackend {
    fn series(mut self, descriptor: MetricSeriesDescriptor, samples: Vec<Sample>) -> Self {
        self.samples.insert(descriptor.id.clone(), samples);
        if descriptor.tags.contains_key(RESOURCE_ID_TAG) {
            self.storage_descriptors.push(descriptor);
        } else {
            self.workload_descriptors.push(descriptor);
        }
        self
    }

    fn queries(&self) -> Vec<TagFilter> {
        self.descriptor_queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricsBackend for MockBackend {
    async fn list_series_descriptors(
        &self,
        filter: &TagFilter,
    ) -> Result<Vec<MetricSeriesDescriptor>, BackendError> {
        self.descriptor_queries.lock().unwrap().push(filter.clone());

        if self.fail_descriptors {
            return Err(BackendError::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }

        if filter.get(RESOURCE_ID_TAG).is_some() {
            Ok(self.storage_descriptors.clone())
        } else {
            Ok(self.workload_descriptors.clone())
        }
    }

    async fn read_latest_samples(
        &self,
        _kind: MetricKind,
        series_id: &str,
        limit: usize,
    ) -> Result<Vec<Sample>, BackendError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        assert_eq!(limit, SAMPLE_LIMIT);

        if let Some(delay) = self.slow_series.get(series_id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_series.contains(series_id) {
            return Err(BackendError::Status {
                status: 503,
                body: format!("read of {} failed", series_id),
            });
        }

        Ok(self.samples.get(series_id).cloned().unwrap_or_default())
    }
}

struct MockConnector {
    backend: Arc<MockBackend>,
    auth_failure: bool,
}

#[async_trait]
impl BackendConnector for MockConnector {
    async fn connect(&self) -> Result<Arc<dyn MetricsBackend>, CollectError> {
        if self.auth_failure {
            return Err(CollectError::Auth("token file missing".to_string()));
        }
        Ok(self.backend.clone())
    }
}

#[derive(Default)]
struct MockInventory {
    workloads: Vec<Workload>,
    claims: Vec<StorageClaim>,
    fail: bool,
    delay: Duration,
}

#[async_trait]
impl Inventory for MockInventory {
    async fn list_workloads(&self, _namespace: &str) -> anyhow::Result<Vec<Workload>> {
        if self.fail {
            anyhow::bail!("pods is forbidden");
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.workloads.clone())
    }

    async fn list_storage_claims(&self, _namespace: &str) -> anyhow::Result<Vec<StorageClaim>> {
        Ok(self.claims.clone())
    }
}

fn workload(name: &str, volumes: &[(&str, &str)]) -> Workload {
    Workload {
        name: name.to_string(),
        attachments: volumes
            .iter()
            .map(|(vol, claim)| StorageAttachment {
                name: vol.to_string(),
                claim_name: claim.to_string(),
            })
            .collect(),
    }
}

fn claim(name: &str) -> StorageClaim {
    StorageClaim {
        name: name.to_string(),
    }
}

fn descriptor(
    id: &str,
    metric: TrackedMetric,
    pod: &str,
    container: &str,
) -> MetricSeriesDescriptor {
    let mut tags = BTreeMap::new();
    tags.insert(DESCRIPTOR_NAME_TAG.to_string(), metric.descriptor_name().to_string());
    tags.insert(POD_NAME_TAG.to_string(), pod.to_string());
    tags.insert(NAMESPACE_NAME_TAG.to_string(), "demo".to_string());
    tags.insert(CONTAINER_NAME_TAG.to_string(), container.to_string());
    MetricSeriesDescriptor {
        id: id.to_string(),
        tags,
    }
}

fn volume_descriptor(metric: TrackedMetric, pod: &str, volume: &str) -> MetricSeriesDescriptor {
    let resource = format!("Volume:{}", volume);
    let mut d = descriptor(
        &format!("pod/{}/{}/{}", pod, metric.descriptor_name(), resource),
        metric,
        pod,
        "",
    );
    d.tags.insert(RESOURCE_ID_TAG.to_string(), resource);
    d
}

fn sample(age_secs: i64, value: f64) -> Sample {
    Sample {
        timestamp: (Utc::now() - chrono::Duration::seconds(age_secs)).timestamp_millis(),
        value: SampleValue::Number(value),
    }
}

fn collector(
    inventory: MockInventory,
    backend: Arc<MockBackend>,
    settings: CollectorSettings,
) -> Collector {
    Collector::new(
        Arc::new(inventory),
        Arc::new(MockConnector {
            backend,
            auth_failure: false,
        }),
        settings,
    )
}

fn settings() -> CollectorSettings {
    CollectorSettings {
        namespace: "demo".to_string(),
        ..Default::default()
    }
}

fn inventory() -> MockInventory {
    MockInventory {
        workloads: vec![workload("web", &[]), workload("db-0", &[("data", "data-db-0")])],
        claims: vec![claim("data-db-0")],
        ..Default::default()
    }
}

fn populated_backend() -> MockBackend {
    MockBackend::default()
        .series(
            descriptor("web/nginx/memory/usage", TrackedMetric::MemoryUsage, "web", "nginx"),
            vec![sample(10, 104857600.0), sample(40, 1.0)],
        )
        .series(
            descriptor("web/memory/limit", TrackedMetric::MemoryLimit, "web", ""),
            vec![sample(120, 536870912.0)],
        )
        .series(
            descriptor("web/cpu/usage_rate", TrackedMetric::CpuUsageRate, "web", ""),
            vec![sample(5, 250.0)],
        )
        .series(
            descriptor("db-0/uptime", TrackedMetric::Uptime, "db-0", ""),
            vec![sample(1, 3600000.0)],
        )
        .series(
            volume_descriptor(TrackedMetric::FilesystemUsage, "db-0", "data"),
            vec![sample(15, 2048.0)],
        )
}

#[tokio::test]
async fn test_cycle_collects_fresh_results() {
    let backend = Arc::new(populated_backend());
    let outcome = collector(inventory(), backend.clone(), settings())
        .collect()
        .await
        .unwrap();

    assert!(outcome.failed_metrics.is_empty());
    // memory/limit is stale and dropped
    let ids: Vec<_> = outcome.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "web/nginx/memory/usage",
            "web/cpu/usage_rate",
            "db-0/uptime",
            "pod/db-0/filesystem/usage/Volume:data",
        ]
    );

    let memory = &outcome.results[0];
    assert_eq!(memory.kind, Classification::Container);
    assert_eq!(memory.value.as_f64(), Some(104857600.0));
    assert_eq!(memory.volume, None);

    assert_eq!(outcome.results[1].kind, Classification::Pod);

    let filesystem = &outcome.results[3];
    assert_eq!(filesystem.volume.as_deref(), Some("data"));

    let queries = backend.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].get(POD_NAME_TAG), Some("web||db-0"));
    assert_eq!(queries[0].get(RESOURCE_ID_TAG), None);
    assert_eq!(queries[1].get(RESOURCE_ID_TAG), Some("Volume:data"));
}

#[tokio::test]
async fn test_fetch_failure_degrades_single_metric() {
    let mut backend = populated_backend();
    backend.failing_series.insert("db-0/uptime".to_string());
    let backend = Arc::new(backend);

    let outcome = collector(inventory(), backend, settings())
        .collect()
        .await
        .unwrap();

    assert_eq!(outcome.failed_metrics, vec![TrackedMetric::Uptime]);
    assert_eq!(outcome.results.len(), 3);
    assert!(outcome
        .results
        .iter()
        .all(|r| r.tag(DESCRIPTOR_NAME_TAG) != "uptime"));
}

#[tokio::test]
async fn test_failed_read_discards_partial_metric_results() {
    let mut backend = populated_backend().series(
        descriptor("db-0/nginx/memory/usage", TrackedMetric::MemoryUsage, "db-0", "nginx"),
        vec![sample(1, 1.0)],
    );
    backend
        .failing_series
        .insert("db-0/nginx/memory/usage".to_string());
    let backend = Arc::new(backend);

    let outcome = collector(inventory(), backend, settings())
        .collect()
        .await
        .unwrap();

    assert_eq!(outcome.failed_metrics, vec![TrackedMetric::MemoryUsage]);
    assert!(outcome
        .results
        .iter()
        .all(|r| r.tag(DESCRIPTOR_NAME_TAG) != "memory/usage"));
}

#[tokio::test]
async fn test_results_keep_descriptor_order_within_metric() {
    let backend = MockBackend::default()
        .series(
            descriptor("b/cpu/limit", TrackedMetric::CpuLimit, "b", ""),
            vec![sample(1, 2.0)],
        )
        .series(
            descriptor("a/cpu/limit", TrackedMetric::CpuLimit, "a", ""),
            vec![sample(1, 1.0)],
        );

    let outcome = collector(inventory(), Arc::new(backend), settings())
        .collect()
        .await
        .unwrap();

    let ids: Vec<_> = outcome.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["b/cpu/limit", "a/cpu/limit"]);
}

#[tokio::test]
async fn test_auth_failure_is_fatal() {
    let backend = Arc::new(populated_backend());
    let collector = Collector::new(
        Arc::new(inventory()),
        Arc::new(MockConnector {
            backend: backend.clone(),
            auth_failure: true,
        }),
        settings(),
    );

    let err = collector.collect().await.unwrap_err();
    assert!(matches!(err, CollectError::Auth(_)));
    assert!(backend.queries().is_empty());
}

#[tokio::test]
async fn test_inventory_failure_is_fatal() {
    let backend = Arc::new(populated_backend());
    let inventory = MockInventory {
        fail: true,
        ..Default::default()
    };

    let err = collector(inventory, backend.clone(), settings())
        .collect()
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::Inventory(_)));
    assert!(err.is_fatal());
    assert!(backend.queries().is_empty());
}

#[tokio::test]
async fn test_descriptor_failure_skips_fetches() {
    let mut backend = populated_backend();
    backend.fail_descriptors = true;
    let backend = Arc::new(backend);

    let err = collector(inventory(), backend.clone(), settings())
        .collect()
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::Descriptors(_)));
    assert_eq!(backend.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_inventory_is_valid() {
    let backend = Arc::new(populated_backend());

    let outcome = collector(MockInventory::default(), backend.clone(), settings())
        .collect()
        .await
        .unwrap();

    assert!(outcome.results.is_empty());
    assert!(outcome.failed_metrics.is_empty());
    assert!(backend.queries().is_empty());
}

#[tokio::test]
async fn test_workloads_without_claims_skip_storage_query() {
    let backend = Arc::new(populated_backend());
    let inventory = MockInventory {
        workloads: vec![workload("a", &[]), workload("b", &[])],
        ..Default::default()
    };

    let outcome = collector(inventory, backend.clone(), settings())
        .collect()
        .await
        .unwrap();

    let queries = backend.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].get(POD_NAME_TAG), Some("a||b"));
    assert!(outcome.results.iter().all(|r| r.volume.is_none()));
}

#[tokio::test]
async fn test_slow_fetch_hits_fetch_timeout() {
    let mut backend = populated_backend();
    backend
        .slow_series
        .insert("web/cpu/usage_rate".to_string(), Duration::from_secs(5));
    let backend = Arc::new(backend);

    let settings = CollectorSettings {
        fetch_timeout: Duration::from_millis(50),
        ..settings()
    };
    let outcome = collector(inventory(), backend, settings)
        .collect()
        .await
        .unwrap();

    assert_eq!(outcome.failed_metrics, vec![TrackedMetric::CpuUsageRate]);
    assert_eq!(outcome.results.len(), 3);
}

#[tokio::test]
async fn test_scrape_deadline_cancels_in_flight_fetches() {
    let mut backend = populated_backend();
    backend
        .slow_series
        .insert("db-0/uptime".to_string(), Duration::from_secs(5));
    let backend = Arc::new(backend);

    let settings = CollectorSettings {
        fetch_timeout: Duration::from_secs(10),
        scrape_timeout: Duration::from_millis(100),
        ..settings()
    };
    let started = std::time::Instant::now();
    let outcome = collector(inventory(), backend, settings)
        .collect()
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(outcome.failed_metrics, vec![TrackedMetric::Uptime]);
    assert_eq!(outcome.results.len(), 3);
}

#[tokio::test]
async fn test_freshness_is_judged_at_cycle_start() {
    let backend = Arc::new(MockBackend::default().series(
        descriptor("web/cpu/usage_rate", TrackedMetric::CpuUsageRate, "web", ""),
        vec![sample(1, 250.0)],
    ));
    let inventory = MockInventory {
        workloads: vec![workload("web", &[])],
        delay: Duration::from_millis(1500),
        ..Default::default()
    };

    // The sample is 1s old when the cycle starts but 2.5s old once fetched
    let settings = CollectorSettings {
        freshness_window: Duration::from_secs(2),
        ..settings()
    };
    let outcome = collector(inventory, backend, settings)
        .collect()
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].value, SampleValue::Number(250.0));
}
