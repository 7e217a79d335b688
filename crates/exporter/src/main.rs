//! Hawkular Exporter - Prometheus exporter for Hawkular Metrics
//!
//! Runs next to an OpenShift cluster and answers every scrape with the
//! latest Hawkular samples of the pods and volumes in one namespace.

use anyhow::Result;
use exporter_lib::{
    backend::HawkularConnector,
    collector::Collector,
    health::{components, HealthRegistry},
    inventory::KubeInventory,
    observability::{ExporterMetrics, ScrapeLogger},
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const EXPORTER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = config::ExporterConfig::load()?;

    info!(
        url = %config.backend.url,
        tenant = %config.backend.tenant,
        namespace = %config.namespace(),
        "Exporter configured"
    );

    let inventory = KubeInventory::infer().await?;
    let connector = HawkularConnector::new(config.hawkular_settings());
    let collector = Collector::new(
        Arc::new(inventory),
        Arc::new(connector),
        config.collector_settings(),
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::ORCHESTRATOR).await;
    health_registry.register(components::METRICS_BACKEND).await;

    let metrics = ExporterMetrics::new();
    metrics.set_build_info(EXPORTER_VERSION);

    let logger = ScrapeLogger::new(config.namespace());
    let addr = config.bind_address();
    logger.log_startup(EXPORTER_VERSION, &addr, &config.backend.url);

    let app_state = Arc::new(api::AppState {
        collector,
        health_registry: health_registry.clone(),
        metrics,
        logger: logger.clone(),
        metric_prefix: config.cli.metric_prefix.clone(),
        metrics_path: config.cli.metrics_path.clone(),
        version: EXPORTER_VERSION.to_string(),
    });

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(api::serve(addr, app_state, async move {
        let _ = stop_rx.await;
    }));

    health_registry.set_ready(true).await;

    tokio::select! {
        reason = shutdown_signal() => {
            logger.log_shutdown(reason?);
            let _ = stop_tx.send(());
            server.await??;
        }
        served = &mut server => {
            // The server only returns early when it failed
            let result = served?;
            if let Err(e) = &result {
                error!(error = %e, "Exporter server stopped");
            }
            result?;
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl-C or SIGTERM
async fn shutdown_signal() -> Result<&'static str> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            ctrl_c = tokio::signal::ctrl_c() => {
                ctrl_c?;
                Ok("SIGINT received")
            }
            _ = terminate.recv() => Ok("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("SIGINT received")
    }
}
