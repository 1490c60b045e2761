//! HTTP server for the Prometheus metrics endpoint.
//!
//! Runs on its own tokio task and serves `/metrics` for scraping. Only
//! started when `[metrics] bind` is set in config; otherwise the hub
//! carries no HTTP surface at all.

use axum::{routing::get, Router};
use std::net::SocketAddr;

async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

/// Run the metrics HTTP server. Long-running; spawn and forget.
pub async fn run_metrics_server(addr: SocketAddr) {
    let app = Router::new().route("/metrics", get(metrics_handler));

    tracing::info!(%addr, "metrics endpoint listening");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, %err, "failed to bind metrics endpoint");
            return;
        }
    };

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!(%err, "metrics server error");
    }
}
