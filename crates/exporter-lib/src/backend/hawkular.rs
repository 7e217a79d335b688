//! HTTP client for the Hawkular Metrics REST API

use super::{auth, BackendConnector, MetricsBackend};
use crate::error::{BackendError, CollectError};
use crate::inventory::TagFilter;
use crate::models::{MetricSeriesDescriptor, Sample};
use crate::tracked::MetricKind;
use async_trait::async_trait;
use reqwest::{Certificate, Client, StatusCode};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const TENANT_HEADER: &str = "Hawkular-Tenant";
const API_PATH: [&str; 2] = ["hawkular", "metrics"];

/// Connection settings for Hawkular Metrics
#[derive(Debug, Clone)]
pub struct HawkularSettings {
    /// Base URL, with or without the `/hawkular/metrics` suffix
    pub url: String,
    /// Tenant the series live under
    pub tenant: String,
    /// Service account token file
    pub token_path: PathBuf,
    /// Extra CA bundle to trust
    pub ca_bundle: Option<PathBuf>,
    /// Disable certificate verification (non-production only)
    pub insecure_skip_tls_verify: bool,
    /// Timeout of a single HTTP request
    pub request_timeout: Duration,
}

impl Default for HawkularSettings {
    fn default() -> Self {
        Self {
            url: "https://hawkular-metrics.openshift-infra.svc".to_string(),
            tenant: String::new(),
            token_path: PathBuf::from(auth::DEFAULT_TOKEN_PATH),
            ca_bundle: None,
            insecure_skip_tls_verify: false,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Builds a fresh authenticated [`HawkularClient`] per cycle
pub struct HawkularConnector {
    settings: HawkularSettings,
}

impl HawkularConnector {
    pub fn new(settings: HawkularSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl BackendConnector for HawkularConnector {
    async fn connect(&self) -> Result<Arc<dyn MetricsBackend>, CollectError> {
        let token = auth::read_token(&self.settings.token_path).await?;
        let roots = auth::load_ca_certificates(self.settings.ca_bundle.as_deref()).await?;

        let client = HawkularClient::new(&self.settings, token, roots)
            .map_err(|e| CollectError::BackendConnect(e.to_string()))?;
        debug!(url = %client.base_url, "Built Hawkular client");

        Ok(Arc::new(client))
    }
}

/// Authenticated Hawkular Metrics client
pub struct HawkularClient {
    http: Client,
    base_url: Url,
    tenant: String,
    token: String,
}

impl HawkularClient {
    pub fn new(
        settings: &HawkularSettings,
        token: String,
        roots: Vec<Certificate>,
    ) -> Result<Self, BackendError> {
        let base_url = metrics_base_url(&settings.url)?;

        if settings.insecure_skip_tls_verify {
            warn!(url = %base_url, "TLS certificate verification is disabled for Hawkular");
        }

        let mut builder = Client::builder()
            .timeout(settings.request_timeout)
            .danger_accept_invalid_certs(settings.insecure_skip_tls_verify);
        for cert in roots {
            builder = builder.add_root_certificate(cert);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
            tenant: settings.tenant.clone(),
            token,
        })
    }

    /// URL of the descriptor listing endpoint
    pub fn definitions_url(&self) -> Result<Url, BackendError> {
        self.endpoint(&["metrics"])
    }

    /// URL of the raw data endpoint of one series
    pub fn raw_url(&self, kind: MetricKind, series_id: &str) -> Result<Url, BackendError> {
        self.endpoint(&[kind.path_segment(), series_id, "raw"])
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, BackendError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .header(TENANT_HEADER, &self.tenant)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl MetricsBackend for HawkularClient {
    async fn list_series_descriptors(
        &self,
        filter: &TagFilter,
    ) -> Result<Vec<MetricSeriesDescriptor>, BackendError> {
        let url = self.definitions_url()?;
        self.get_list(url, &[("tags", filter.to_query())]).await
    }

    async fn read_latest_samples(
        &self,
        kind: MetricKind,
        series_id: &str,
        limit: usize,
    ) -> Result<Vec<Sample>, BackendError> {
        let url = self.raw_url(kind, series_id)?;
        self.get_list(
            url,
            &[("limit", limit.to_string()), ("order", "DESC".to_string())],
        )
        .await
    }
}

/// Normalize the configured URL to end in `/hawkular/metrics`
pub(crate) fn metrics_base_url(raw: &str) -> Result<Url, BackendError> {
    let mut url = Url::parse(raw).map_err(|e| BackendError::Url(format!("{}: {}", raw, e)))?;

    let segments: Vec<String> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).map(String::from).collect())
        .unwrap_or_default();
    let has_api_path = segments.len() >= 2 && segments[segments.len() - 2..] == API_PATH;

    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| BackendError::Url(format!("{}: cannot be a base url", raw)))?;
        path.pop_if_empty();
        if !has_api_path {
            path.extend(API_PATH);
        }
    }

    Ok(url)
}
