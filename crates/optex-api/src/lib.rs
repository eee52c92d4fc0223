//! optex-api — HTTP surface for optex.
//!
//! Serves the Prometheus text exposition of an [`Exporter`]. Any `GET` whose
//! path ends in `/metrics` or `/metrics/` is a scrape, so the exporter can
//! sit below an arbitrary prefix (`/blog/metrics`). Everything else is 404.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics`, `/metrics/` | Prometheus exposition |
//! | GET | `*/metrics`, `*/metrics/` | Prometheus exposition (any prefix) |
//! | PUT | `/api/v1/series` | Update one series |
//! | POST | `/api/v1/series/fetch` | Read one series |
//!
//! The series routes let one-shot producers write through a running server,
//! which owns the store.

pub mod handlers;

use axum::Router;
use axum::routing::{get, post, put};
use optex_metrics::Exporter;

pub use handlers::{ApiResponse, SeriesRequest, SeriesValue};

/// Update route for one series.
pub const SERIES_PATH: &str = "/api/v1/series";
/// Read route for one series.
pub const SERIES_FETCH_PATH: &str = "/api/v1/series/fetch";

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub exporter: Exporter,
}

/// Build the router serving the scrape endpoint.
pub fn build_router(exporter: Exporter) -> Router {
    let state = ApiState { exporter };

    Router::new()
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/metrics/", get(handlers::prometheus_metrics))
        .route(SERIES_PATH, put(handlers::update_series))
        .route(SERIES_FETCH_PATH, post(handlers::fetch_series))
        .fallback(handlers::fallback)
        .with_state(state)
}
