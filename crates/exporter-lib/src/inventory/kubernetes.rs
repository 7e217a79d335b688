//! Kubernetes-backed inventory

use super::Inventory;
use crate::models::{StorageAttachment, StorageClaim, Workload};
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use kube::api::{Api, ListParams};
use kube::Client;
use tracing::{debug, info};

/// Inventory that lists pods and claims through the Kubernetes API
#[derive(Clone)]
pub struct KubeInventory {
    client: Client,
}

impl KubeInventory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the in-cluster service account, falling back to
    /// the local kubeconfig
    pub async fn infer() -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("Failed to create Kubernetes client")?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Inventory for KubeInventory {
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<Workload>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&ListParams::default())
            .await
            .with_context(|| format!("Failed to list pods in {}", namespace))?;

        let workloads: Vec<Workload> = list.items.iter().filter_map(workload_from_pod).collect();
        info!(namespace = %namespace, count = workloads.len(), "Listed pods");
        Ok(workloads)
    }

    async fn list_storage_claims(&self, namespace: &str) -> Result<Vec<StorageClaim>> {
        let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        let list = pvcs
            .list(&ListParams::default())
            .await
            .with_context(|| format!("Failed to list persistent volume claims in {}", namespace))?;

        let claims: Vec<StorageClaim> = list
            .items
            .into_iter()
            .filter_map(|pvc| pvc.metadata.name)
            .map(|name| StorageClaim { name })
            .collect();
        info!(namespace = %namespace, count = claims.len(), "Listed volume claims");
        Ok(claims)
    }
}

/// Convert a pod into a workload, keeping only claim-backed volumes
///
/// Returns `None` for pods without a name.
pub fn workload_from_pod(pod: &Pod) -> Option<Workload> {
    let name = pod.metadata.name.clone()?;

    let attachments = pod
        .spec
        .as_ref()
        .and_then(|spec| spec.volumes.as_ref())
        .map(|volumes| {
            volumes
                .iter()
                .filter_map(|vol| {
                    vol.persistent_volume_claim.as_ref().map(|pvc| StorageAttachment {
                        name: vol.name.clone(),
                        claim_name: pvc.claim_name.clone(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    debug!(pod = %name, "Resolved workload");
    Some(Workload { name, attachments })
}
