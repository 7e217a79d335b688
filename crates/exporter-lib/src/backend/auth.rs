//! Service account credentials and TLS trust for the backend client

use crate::error::CollectError;
use reqwest::Certificate;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Service account token mounted into every pod
pub const DEFAULT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// CA bundles looked up when no explicit bundle is configured
pub const CLUSTER_CA_BUNDLES: &[&str] = &[
    "/var/run/secrets/kubernetes.io/serviceaccount/service-ca.crt",
    "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt",
];

/// Read the bearer token, trimmed of surrounding whitespace
pub async fn read_token(path: &Path) -> Result<String, CollectError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CollectError::Auth(format!("{}: {}", path.display(), e)))?;

    let token = raw.trim();
    if token.is_empty() {
        return Err(CollectError::Auth(format!("{} is empty", path.display())));
    }

    Ok(token.to_string())
}

/// Bundles to trust: the explicit one, or the cluster bundles present on disk
pub fn ca_bundle_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => CLUSTER_CA_BUNDLES
            .iter()
            .map(PathBuf::from)
            .filter(|p| p.exists())
            .collect(),
    }
}

/// Load extra root certificates for the backend client
///
/// Every certificate of every bundle is trusted. An explicitly configured
/// bundle must be readable.
pub async fn load_ca_certificates(
    explicit: Option<&Path>,
) -> Result<Vec<Certificate>, CollectError> {
    let mut certs = Vec::new();

    for path in ca_bundle_paths(explicit) {
        let pem = tokio::fs::read(&path).await.map_err(|e| {
            CollectError::BackendConnect(format!("CA bundle {}: {}", path.display(), e))
        })?;
        let bundle = Certificate::from_pem_bundle(&pem).map_err(|e| {
            CollectError::BackendConnect(format!("CA bundle {}: {}", path.display(), e))
        })?;
        if bundle.is_empty() {
            return Err(CollectError::BackendConnect(format!(
                "CA bundle {}: no certificates found",
                path.display()
            )));
        }
        debug!(path = %path.display(), count = bundle.len(), "Trusting CA bundle");
        certs.extend(bundle);
    }

    Ok(certs)
}
