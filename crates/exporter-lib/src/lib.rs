//! Collection pipeline for the Hawkular exporter
//!
//! This crate provides the core functionality for:
//! - Resolving pods and volume claims from the Kubernetes API
//! - Querying Hawkular Metrics for the latest samples of those workloads
//! - Fanning out the ten tracked metric fetches concurrently
//! - Mapping results onto labeled Prometheus series
//! - Health checks and self-observability

pub mod backend;
pub mod collector;
pub mod error;
pub mod health;
pub mod inventory;
pub mod mapper;
pub mod models;
pub mod observability;
pub mod tracked;

pub use error::CollectError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ExporterMetrics, ScrapeLogger};
pub use tracked::{MetricKind, Scope, TrackedMetric};
