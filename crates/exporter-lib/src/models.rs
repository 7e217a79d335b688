//! Core data models for the exporter
//!
//! Everything here is rebuilt on every scrape and dropped once the
//! results are mapped to output series.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag key carrying the metric name on a series descriptor
pub const DESCRIPTOR_NAME_TAG: &str = "descriptor_name";
/// Tag key naming the container a series belongs to (empty for pod series)
pub const CONTAINER_NAME_TAG: &str = "container_name";
/// Tag key naming the pod a series belongs to
pub const POD_NAME_TAG: &str = "pod_name";
/// Tag key naming the namespace a series belongs to
pub const NAMESPACE_NAME_TAG: &str = "namespace_name";
/// Tag key identifying the resource (volume) of a storage series
pub const RESOURCE_ID_TAG: &str = "resource_id";

/// A running pod and the claim-backed volumes it declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub name: String,
    pub attachments: Vec<StorageAttachment>,
}

/// A pod volume backed by a persistent volume claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAttachment {
    /// Volume name as declared in the pod spec
    pub name: String,
    /// Name of the claim backing the volume
    pub claim_name: String,
}

/// A persistent volume claim present in the namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageClaim {
    pub name: String,
}

/// Backend metadata for one time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeriesDescriptor {
    pub id: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl MetricSeriesDescriptor {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn descriptor_name(&self) -> Option<&str> {
        self.tag(DESCRIPTOR_NAME_TAG)
    }
}

/// Raw sample value as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Number(f64),
    Text(String),
}

impl SampleValue {
    /// Numeric view of the value, parsing text values when possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SampleValue::Number(v) => Some(*v),
            SampleValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// A single data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub value: SampleValue,
}

impl Sample {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// True when the sample is younger than `window` at `now`
    ///
    /// Samples dated after `now` count as fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.time() {
            Some(ts) => now - ts < window,
            None => false,
        }
    }
}

/// Whether a series describes a whole pod or one of its containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Pod,
    Container,
}

impl Classification {
    /// `Container` iff the container name tag is non-empty
    pub fn from_tags(tags: &BTreeMap<String, String>) -> Self {
        match tags.get(CONTAINER_NAME_TAG) {
            Some(name) if !name.is_empty() => Classification::Container,
            _ => Classification::Pod,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Pod => "pod",
            Classification::Container => "container",
        }
    }
}

/// The latest fresh value of one series, ready for mapping
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMetric {
    pub kind: Classification,
    pub id: String,
    pub tags: BTreeMap<String, String>,
    pub value: SampleValue,
    /// Volume the series belongs to, resolved for storage-scoped metrics
    pub volume: Option<String>,
}

impl ResultMetric {
    /// Tag value or the empty string when absent
    pub fn tag(&self, key: &str) -> &str {
        self.tags.get(key).map(String::as_str).unwrap_or("")
    }
}
