//! HTTP API: Prometheus exposition, landing page and health checks

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use exporter_lib::{
    collector::Collector,
    health::{ComponentStatus, HealthRegistry},
    mapper::map_results,
    observability::{ExporterMetrics, ScrapeLogger},
};
use prometheus::{Encoder, TextEncoder};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub collector: Collector,
    pub health_registry: HealthRegistry,
    pub metrics: ExporterMetrics,
    pub logger: ScrapeLogger,
    pub metric_prefix: String,
    pub metrics_path: String,
    pub version: String,
}

/// Run one collection cycle and expose it with the exporter's own metrics
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let started = Instant::now();
    let outcome = state.collector.collect().await;
    let elapsed = started.elapsed().as_secs_f64();

    state.health_registry.record_scrape(&outcome).await;

    let mapped = match map_results(&state.metric_prefix, &outcome) {
        Ok(mapped) => mapped,
        Err(e) => {
            error!(error = %e, "Failed to build scrape registry");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    state.metrics.observe_scrape_duration(elapsed);
    state.metrics.set_series_emitted(mapped.emitted);
    match &outcome {
        Ok(outcome) => {
            for metric in &outcome.failed_metrics {
                state.metrics.inc_fetch_failure(*metric);
            }
            state.logger.log_scrape_completed(
                elapsed,
                mapped.emitted,
                mapped.dropped,
                &outcome.failed_metrics,
            );
        }
        Err(e) => {
            state.metrics.inc_scrape_failure(e.class());
            state.logger.log_scrape_failed(elapsed, e);
        }
    }

    let mut families = mapped.families;
    families.extend(prometheus::gather());

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

async fn landing(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(format!(
        "<html>\n\
         <head><title>Hawkular Exporter</title></head>\n\
         <body>\n\
         <h1>Hawkular Exporter</h1>\n\
         <p>Version {}</p>\n\
         <p><a href=\"{}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        state.version, state.metrics_path
    ))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still serving partial data
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(&state.metrics_path, get(metrics))
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve(
    addr: String,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to listen on {}", addr))?;
    info!(addr = %addr, "Starting exporter server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
