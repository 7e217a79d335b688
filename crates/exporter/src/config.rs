//! Exporter configuration
//!
//! Process flags come from the command line (or `EXPORTER_*` variables);
//! the Hawkular connection comes from `HAWKULAR_*` variables.

use anyhow::{bail, Context, Result};
use clap::Parser;
use exporter_lib::backend::auth::DEFAULT_TOKEN_PATH;
use exporter_lib::backend::HawkularSettings;
use exporter_lib::collector::CollectorSettings;
use exporter_lib::mapper::DEFAULT_PREFIX;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Paths served besides the metrics endpoint
const RESERVED_PATHS: &[&str] = &["/", "/healthz", "/readyz"];

/// Command line flags
#[derive(Debug, Clone, Parser)]
#[command(name = "hawkular-exporter", version, about)]
pub struct Cli {
    /// Path under which to expose metrics
    #[arg(long, env = "EXPORTER_METRICS_PATH", default_value = "/metrics")]
    pub metrics_path: String,

    /// Address to listen on; a bare `:port` binds all interfaces
    #[arg(long, env = "EXPORTER_LISTEN_ADDRESS", default_value = ":9189")]
    pub listen_address: String,

    /// Namespace whose pods are exported (defaults to the tenant)
    #[arg(long, env = "EXPORTER_NAMESPACE")]
    pub namespace: Option<String>,

    /// Prefix of the exported series
    #[arg(long, env = "EXPORTER_METRIC_PREFIX", default_value = DEFAULT_PREFIX)]
    pub metric_prefix: String,

    /// Deadline of a single metric fetch
    #[arg(long, env = "EXPORTER_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// Deadline of all metric fetches of one scrape
    #[arg(long, env = "EXPORTER_SCRAPE_TIMEOUT_SECS", default_value_t = 30)]
    pub scrape_timeout_secs: u64,
}

/// Hawkular connection, read from `HAWKULAR_*` variables
#[derive(Debug, Clone, Deserialize)]
pub struct BackendEnv {
    pub url: String,
    pub tenant: String,

    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,

    #[serde(default)]
    pub ca_bundle: Option<PathBuf>,

    #[serde(default)]
    pub insecure_skip_tls_verify: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_token_path() -> PathBuf {
    PathBuf::from(DEFAULT_TOKEN_PATH)
}

fn default_request_timeout() -> u64 {
    30
}

impl BackendEnv {
    pub fn load() -> Result<Self> {
        Self::from_source(config::Environment::with_prefix("HAWKULAR"))
    }

    fn from_source(source: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(source.try_parsing(true))
            .build()?;

        let env: BackendEnv = config
            .try_deserialize()
            .context("HAWKULAR_URL and HAWKULAR_TENANT must be set")?;
        if env.url.trim().is_empty() {
            bail!("HAWKULAR_URL is empty");
        }
        if env.tenant.trim().is_empty() {
            bail!("HAWKULAR_TENANT is empty");
        }

        Ok(env)
    }
}

/// Complete exporter configuration
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub cli: Cli,
    pub backend: BackendEnv,
}

impl ExporterConfig {
    /// Load flags and environment, exiting on `--help` / `--version`
    pub fn load() -> Result<Self> {
        Self::new(Cli::parse(), BackendEnv::load()?)
    }

    pub fn new(cli: Cli, backend: BackendEnv) -> Result<Self> {
        validate_metrics_path(&cli.metrics_path)?;
        validate_metric_prefix(&cli.metric_prefix)?;
        Ok(Self { cli, backend })
    }

    pub fn namespace(&self) -> &str {
        self.cli
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(&self.backend.tenant)
    }

    pub fn bind_address(&self) -> String {
        bind_address(&self.cli.listen_address)
    }

    pub fn hawkular_settings(&self) -> HawkularSettings {
        HawkularSettings {
            url: self.backend.url.clone(),
            tenant: self.backend.tenant.clone(),
            token_path: self.backend.token_path.clone(),
            ca_bundle: self.backend.ca_bundle.clone(),
            insecure_skip_tls_verify: self.backend.insecure_skip_tls_verify,
            request_timeout: Duration::from_secs(self.backend.request_timeout_secs),
        }
    }

    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            namespace: self.namespace().to_string(),
            fetch_timeout: Duration::from_secs(self.cli.fetch_timeout_secs),
            scrape_timeout: Duration::from_secs(self.cli.scrape_timeout_secs),
            ..Default::default()
        }
    }
}

/// Normalize a listen address; `:9189` becomes `0.0.0.0:9189`
pub fn bind_address(listen: &str) -> String {
    if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen.to_string()
    }
}

fn validate_metrics_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        bail!("metrics path must start with '/': {}", path);
    }
    if RESERVED_PATHS.contains(&path) {
        bail!("metrics path {} is already served", path);
    }
    Ok(())
}

/// Prefixes must keep every series name valid; empty disables prefixing
fn validate_metric_prefix(prefix: &str) -> Result<()> {
    let mut chars = prefix.chars();
    let valid = match chars.next() {
        None => true,
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_' || first == ':')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
    };
    if !valid {
        bail!("invalid metric prefix: {}", prefix);
    }
    Ok(())
}
