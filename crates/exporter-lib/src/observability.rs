//! Observability infrastructure for the exporter itself
//!
//! Provides:
//! - Prometheus self-metrics on the process-wide registry
//! - Structured scrape events with tracing

use crate::error::CollectError;
use crate::tracked::TrackedMetric;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, register_int_gauge,
    GaugeVec, Histogram, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for scrape durations (in seconds)
const SCRAPE_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0];

static GLOBAL_METRICS: OnceLock<ExporterMetricsInner> = OnceLock::new();

struct ExporterMetricsInner {
    scrape_duration_seconds: Histogram,
    scrape_failures: IntCounterVec,
    fetch_failures: IntCounterVec,
    series_emitted: IntGauge,
    build_info: GaugeVec,
}

impl ExporterMetricsInner {
    fn new() -> Self {
        Self {
            scrape_duration_seconds: register_histogram!(
                "hawkular_exporter_scrape_duration_seconds",
                "Time spent answering a scrape, including all Hawkular queries",
                SCRAPE_BUCKETS.to_vec()
            )
            .expect("Failed to register scrape_duration_seconds"),

            scrape_failures: register_int_counter_vec!(
                "hawkular_exporter_scrape_failures_total",
                "Scrapes that reported up 0, by failure class",
                &["class"]
            )
            .expect("Failed to register scrape_failures_total"),

            fetch_failures: register_int_counter_vec!(
                "hawkular_exporter_fetch_failures_total",
                "Metric fetches that failed or timed out",
                &["metric"]
            )
            .expect("Failed to register fetch_failures_total"),

            series_emitted: register_int_gauge!(
                "hawkular_exporter_series_emitted",
                "Samples written by the last scrape"
            )
            .expect("Failed to register series_emitted"),

            build_info: register_gauge_vec!(
                "hawkular_exporter_build_info",
                "Version of the running exporter",
                &["version"]
            )
            .expect("Failed to register build_info"),
        }
    }
}

/// Exporter self-metrics
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct ExporterMetrics {
    _private: (),
}

impl Default for ExporterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ExporterMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ExporterMetricsInner {
        GLOBAL_METRICS.get_or_init(ExporterMetricsInner::new)
    }

    pub fn observe_scrape_duration(&self, duration_secs: f64) {
        self.inner().scrape_duration_seconds.observe(duration_secs);
    }

    pub fn inc_scrape_failure(&self, class: &str) {
        self.inner()
            .scrape_failures
            .with_label_values(&[class])
            .inc();
    }

    pub fn inc_fetch_failure(&self, metric: TrackedMetric) {
        self.inner()
            .fetch_failures
            .with_label_values(&[metric.descriptor_name()])
            .inc();
    }

    pub fn set_series_emitted(&self, count: usize) {
        self.inner().series_emitted.set(count as i64);
    }

    pub fn set_build_info(&self, version: &str) {
        self.inner().build_info.reset();
        self.inner()
            .build_info
            .with_label_values(&[version])
            .set(1.0);
    }
}

/// Structured logger for scrape lifecycle events
#[derive(Clone)]
pub struct ScrapeLogger {
    namespace: String,
}

impl ScrapeLogger {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn log_startup(&self, version: &str, listen_address: &str, hawkular_url: &str) {
        info!(
            event = "exporter_started",
            namespace = %self.namespace,
            version = %version,
            listen_address = %listen_address,
            hawkular_url = %hawkular_url,
            "Hawkular exporter started"
        );
    }

    pub fn log_scrape_completed(
        &self,
        duration_secs: f64,
        emitted: usize,
        dropped: usize,
        failed_metrics: &[TrackedMetric],
    ) {
        if failed_metrics.is_empty() {
            info!(
                event = "scrape_completed",
                namespace = %self.namespace,
                duration_secs = duration_secs,
                emitted = emitted,
                dropped = dropped,
                "Scrape completed"
            );
        } else {
            let failed: Vec<&str> = failed_metrics.iter().map(|m| m.descriptor_name()).collect();
            warn!(
                event = "scrape_completed",
                namespace = %self.namespace,
                duration_secs = duration_secs,
                emitted = emitted,
                dropped = dropped,
                failed_metrics = %failed.join(","),
                "Scrape completed with missing metrics"
            );
        }
    }

    pub fn log_scrape_failed(&self, duration_secs: f64, error: &CollectError) {
        warn!(
            event = "scrape_failed",
            namespace = %self.namespace,
            duration_secs = duration_secs,
            class = %error.class(),
            error = %error,
            "Scrape failed, reporting up 0"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "exporter_shutdown",
            namespace = %self.namespace,
            reason = %reason,
            "Hawkular exporter shutting down"
        );
    }
}
