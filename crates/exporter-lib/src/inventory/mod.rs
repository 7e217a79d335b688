//! Workload inventory from the Kubernetes API
//!
//! Lists the pods and persistent volume claims of the monitored namespace
//! and turns them into the tag filters used to scope Hawkular queries.

mod kubernetes;
mod tags;

pub use kubernetes::{workload_from_pod, KubeInventory};
pub use tags::{
    build_pods_tag, build_vol_tag, ScrapeFilters, TagFilter, TAG_SEPARATOR, VOLUME_MARKER,
};

use crate::models::{StorageClaim, Workload};
use anyhow::Result;
use async_trait::async_trait;

/// Source of pods and volume claims for a namespace
#[async_trait]
pub trait Inventory: Send + Sync {
    /// List the workloads running in `namespace`
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<Workload>>;

    /// List the persistent volume claims in `namespace`
    async fn list_storage_claims(&self, namespace: &str) -> Result<Vec<StorageClaim>>;
}
