//! `/health` + Prometheus `/metrics` surface, served per worker when
//! `metrics.port != 0`. A small `axum` `Router` installs a
//! `PrometheusHandle` and exposes it as a route.

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

/// Installs the global Prometheus recorder and spawns the HTTP server in the
/// background. No-op if `port` is 0.
pub async fn serve(worker_name: &'static str, port: u16) -> anyhow::Result<()> {
    if port == 0 {
        tracing::debug!("metrics server disabled for {worker_name}");
        return Ok(());
    }

    let handle: PrometheusHandle = PrometheusBuilder::new().install_recorder()?;

    let app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(move || render(handle.clone())))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("{worker_name} metrics server listening on {addr}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("metrics server exited: {e}");
        }
    });

    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn render(handle: PrometheusHandle) -> String {
    handle.render()
}
