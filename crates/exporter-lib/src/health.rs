//! Health reporting for the exporter
//!
//! Tracks the state of the two upstreams (Kubernetes API and Hawkular)
//! as observed by the most recent scrape.

use crate::collector::CycleOutcome;
use crate::error::CollectError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Last scrape succeeded against this component
    Healthy,
    /// Last scrape got partial results
    Degraded,
    /// Last scrape failed on this component
    Unhealthy,
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status among the components
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;

        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }

        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const ORCHESTRATOR: &str = "orchestrator";
    pub const METRICS_BACKEND: &str = "metrics_backend";
}

/// Health registry shared between the server and its handlers
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), ComponentHealth::healthy());
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), health);
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Update component health from a scrape's outcome
    pub async fn record_scrape(&self, outcome: &Result<CycleOutcome, CollectError>) {
        match outcome {
            Ok(outcome) => {
                self.update(components::ORCHESTRATOR, ComponentHealth::healthy())
                    .await;
                let backend = if outcome.failed_metrics.is_empty() {
                    ComponentHealth::healthy()
                } else {
                    let failed: Vec<String> =
                        outcome.failed_metrics.iter().map(|m| m.to_string()).collect();
                    ComponentHealth::degraded(format!("fetch failed: {}", failed.join(", ")))
                };
                self.update(components::METRICS_BACKEND, backend).await;
            }
            Err(e @ CollectError::Inventory(_)) => {
                self.update(components::ORCHESTRATOR, ComponentHealth::unhealthy(e.to_string()))
                    .await;
            }
            Err(e @ CollectError::Descriptors(_)) => {
                // The inventory was listed before the descriptor query
                self.update(components::ORCHESTRATOR, ComponentHealth::healthy())
                    .await;
                self.update(
                    components::METRICS_BACKEND,
                    ComponentHealth::unhealthy(e.to_string()),
                )
                .await;
            }
            // Auth and connect failures happen before the inventory is
            // queried, so the orchestrator keeps its last known state
            Err(e) => {
                self.update(
                    components::METRICS_BACKEND,
                    ComponentHealth::unhealthy(e.to_string()),
                )
                .await;
            }
        }
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Ready once initialized; upstream failures are reported via `up`
    /// and must not take the exporter out of service
    pub async fn readiness(&self) -> ReadinessResponse {
        if *self.ready.read().await {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some("Exporter not yet initialized".to_string()),
            }
        }
    }
}
