//! The ten tracked Hawkular metrics and their output schema

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hawkular metric type, which selects the REST collection to read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    /// REST path segment for raw data reads
    pub fn path_segment(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauges",
            MetricKind::Counter => "counters",
        }
    }
}

/// Which descriptor list a metric is fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Pod and container series, filtered by pod names
    Workload,
    /// Volume series, additionally filtered by resource id
    Storage,
}

/// Label schema of an output series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSchema {
    /// kind, pod_name, container_name, namespace
    Workload,
    /// pod_name, namespace
    PodNamespace,
    /// pod_name, container_name
    PodContainer,
    /// volume_name, pod_name, namespace
    Volume,
}

impl LabelSchema {
    pub fn label_names(&self) -> &'static [&'static str] {
        match self {
            LabelSchema::Workload => &["kind", "pod_name", "container_name", "namespace"],
            LabelSchema::PodNamespace => &["pod_name", "namespace"],
            LabelSchema::PodContainer => &["pod_name", "container_name"],
            LabelSchema::Volume => &["volume_name", "pod_name", "namespace"],
        }
    }
}

/// A metric the exporter reads from Hawkular and republishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackedMetric {
    MemoryUsage,
    MemoryLimit,
    CpuUsageRate,
    CpuLimit,
    Uptime,
    NetworkRxRate,
    NetworkTxRate,
    FilesystemAvailable,
    FilesystemLimit,
    FilesystemUsage,
}

impl TrackedMetric {
    /// All tracked metrics in fetch and output order
    pub const ALL: [TrackedMetric; 10] = [
        TrackedMetric::MemoryUsage,
        TrackedMetric::MemoryLimit,
        TrackedMetric::CpuUsageRate,
        TrackedMetric::CpuLimit,
        TrackedMetric::Uptime,
        TrackedMetric::NetworkRxRate,
        TrackedMetric::NetworkTxRate,
        TrackedMetric::FilesystemAvailable,
        TrackedMetric::FilesystemLimit,
        TrackedMetric::FilesystemUsage,
    ];

    /// Value of the `descriptor_name` tag in Hawkular
    pub fn descriptor_name(&self) -> &'static str {
        match self {
            TrackedMetric::MemoryUsage => "memory/usage",
            TrackedMetric::MemoryLimit => "memory/limit",
            TrackedMetric::CpuUsageRate => "cpu/usage_rate",
            TrackedMetric::CpuLimit => "cpu/limit",
            TrackedMetric::Uptime => "uptime",
            TrackedMetric::NetworkRxRate => "network/rx_rate",
            TrackedMetric::NetworkTxRate => "network/tx_rate",
            TrackedMetric::FilesystemAvailable => "filesystem/available",
            TrackedMetric::FilesystemLimit => "filesystem/limit",
            TrackedMetric::FilesystemUsage => "filesystem/usage",
        }
    }

    pub fn from_descriptor_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.descriptor_name() == name)
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            TrackedMetric::Uptime => MetricKind::Counter,
            _ => MetricKind::Gauge,
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            TrackedMetric::FilesystemAvailable
            | TrackedMetric::FilesystemLimit
            | TrackedMetric::FilesystemUsage => Scope::Storage,
            _ => Scope::Workload,
        }
    }

    /// Output series name, without the exporter prefix
    pub fn series_name(&self) -> &'static str {
        match self {
            TrackedMetric::MemoryUsage => "mem_usage_bytes",
            TrackedMetric::MemoryLimit => "mem_limit_bytes",
            TrackedMetric::CpuUsageRate => "cpu_usage_millicores",
            TrackedMetric::CpuLimit => "cpu_limit_millicores",
            TrackedMetric::Uptime => "uptime_milliseconds",
            TrackedMetric::NetworkRxRate => "network_rx_bytes_seconds",
            TrackedMetric::NetworkTxRate => "network_tx_bytes_seconds",
            TrackedMetric::FilesystemAvailable => "filesystem_available_bytes",
            TrackedMetric::FilesystemLimit => "filesystem_limit_bytes",
            TrackedMetric::FilesystemUsage => "filesystem_usage_bytes",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            TrackedMetric::MemoryUsage => "Memory usage of the pod",
            TrackedMetric::MemoryLimit => "Memory limit of the pod",
            TrackedMetric::CpuUsageRate => "CPU usage of the pod",
            TrackedMetric::CpuLimit => "CPU limit of the pod",
            TrackedMetric::Uptime => "Uptime of the pod",
            TrackedMetric::NetworkRxRate => "Network RX per sec of the pod",
            TrackedMetric::NetworkTxRate => "Network TX per sec of the pod",
            TrackedMetric::FilesystemAvailable => "Filesystem available of the volume of the pod",
            TrackedMetric::FilesystemLimit => "Filesystem limit of the volume of the pod",
            TrackedMetric::FilesystemUsage => "Filesystem usage of the volume of the pod",
        }
    }

    pub fn labels(&self) -> LabelSchema {
        match self {
            TrackedMetric::NetworkTxRate => LabelSchema::PodNamespace,
            TrackedMetric::NetworkRxRate => LabelSchema::PodContainer,
            TrackedMetric::FilesystemAvailable
            | TrackedMetric::FilesystemLimit
            | TrackedMetric::FilesystemUsage => LabelSchema::Volume,
            _ => LabelSchema::Workload,
        }
    }
}

impl fmt::Display for TrackedMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descriptor_name())
    }
}
