//! Mapping of collected results onto Prometheus series
//!
//! Every scrape gets its own registry, so series that disappeared from
//! Hawkular never linger in the output.

use crate::collector::CycleOutcome;
use crate::error::CollectError;
use crate::models::{
    ResultMetric, CONTAINER_NAME_TAG, DESCRIPTOR_NAME_TAG, NAMESPACE_NAME_TAG, POD_NAME_TAG,
};
use crate::tracked::{LabelSchema, MetricKind, TrackedMetric};
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, Gauge, GaugeVec, Opts, Registry};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Default prefix of every exported series
pub const DEFAULT_PREFIX: &str = "hawkular";

/// Output of one scrape
#[derive(Debug)]
pub struct MappedScrape {
    pub families: Vec<MetricFamily>,
    /// Number of samples written to the ten metric series
    pub emitted: usize,
    /// Number of results that could not be mapped
    pub dropped: usize,
}

enum SeriesVec {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

/// The `up` gauge and the ten metric vectors of one scrape
struct ScrapeSeries {
    registry: Registry,
    up: Gauge,
    series: BTreeMap<TrackedMetric, SeriesVec>,
    /// Label sets already written per series; the first sample wins
    written: BTreeSet<(TrackedMetric, Vec<String>)>,
}

impl ScrapeSeries {
    fn new(prefix: &str) -> prometheus::Result<Self> {
        let prefix = (!prefix.is_empty()).then(|| prefix.to_string());
        let registry = Registry::new_custom(prefix, None)?;

        let up = Gauge::with_opts(Opts::new(
            "up",
            "Was the last query of hawkular successful",
        ))?;
        registry.register(Box::new(up.clone()))?;

        let mut series = BTreeMap::new();
        for metric in TrackedMetric::ALL {
            let opts = Opts::new(metric.series_name(), metric.help());
            let labels = metric.labels().label_names();
            let vec = match metric.kind() {
                MetricKind::Gauge => {
                    let vec = GaugeVec::new(opts, labels)?;
                    registry.register(Box::new(vec.clone()))?;
                    SeriesVec::Gauge(vec)
                }
                MetricKind::Counter => {
                    let vec = CounterVec::new(opts, labels)?;
                    registry.register(Box::new(vec.clone()))?;
                    SeriesVec::Counter(vec)
                }
            };
            series.insert(metric, vec);
        }

        Ok(Self {
            registry,
            up,
            series,
            written: BTreeSet::new(),
        })
    }

    /// Record one result; returns false when it was dropped
    fn record(&mut self, result: &ResultMetric) -> bool {
        let descriptor_name = result.tag(DESCRIPTOR_NAME_TAG);
        let Some(metric) = TrackedMetric::from_descriptor_name(descriptor_name) else {
            debug!(descriptor_name = %descriptor_name, "Metric not yet supported");
            return false;
        };
        let Some(labels) = label_values(metric.labels(), result) else {
            debug!(series = %result.id, "No volume for filesystem series");
            return false;
        };
        let Some(value) = result.value.as_f64() else {
            debug!(series = %result.id, value = ?result.value, "Non-numeric sample");
            return false;
        };

        let Some(vec) = self.series.get(&metric) else {
            return false;
        };
        if matches!(vec, SeriesVec::Counter(_)) && value < 0.0 {
            debug!(series = %result.id, value, "Negative counter value");
            return false;
        }

        let key = labels.iter().map(|l| l.to_string()).collect();
        if !self.written.insert((metric, key)) {
            debug!(series = %result.id, "Duplicate label set");
            return false;
        }

        match vec {
            SeriesVec::Gauge(vec) => vec.with_label_values(&labels).set(value),
            SeriesVec::Counter(vec) => vec.with_label_values(&labels).inc_by(value),
        }
        true
    }
}

/// Label values of a result under the given schema
///
/// Volume series without a resolved volume yield `None`.
fn label_values(schema: LabelSchema, result: &ResultMetric) -> Option<Vec<&str>> {
    let pod = result.tag(POD_NAME_TAG);
    let container = result.tag(CONTAINER_NAME_TAG);
    let namespace = result.tag(NAMESPACE_NAME_TAG);

    let values = match schema {
        LabelSchema::Workload => vec![result.kind.as_str(), pod, container, namespace],
        LabelSchema::PodNamespace => vec![pod, namespace],
        LabelSchema::PodContainer => vec![pod, container],
        LabelSchema::Volume => vec![result.volume.as_deref()?, pod, namespace],
    };
    Some(values)
}

/// Map a cycle's outcome to metric families
///
/// A failed cycle produces only `up 0`.
pub fn map_results(
    prefix: &str,
    outcome: &Result<CycleOutcome, CollectError>,
) -> prometheus::Result<MappedScrape> {
    let mut scrape = ScrapeSeries::new(prefix)?;
    let mut emitted = 0;
    let mut dropped = 0;

    match outcome {
        Ok(outcome) => {
            scrape.up.set(1.0);
            for result in &outcome.results {
                if scrape.record(result) {
                    emitted += 1;
                } else {
                    dropped += 1;
                }
            }
        }
        Err(_) => scrape.up.set(0.0),
    }

    Ok(MappedScrape {
        families: scrape.registry.gather(),
        emitted,
        dropped,
    })
}
