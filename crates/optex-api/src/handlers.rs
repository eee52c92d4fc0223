//! Request handlers.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use optex_metrics::{LabelSet, MetricsError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ApiState;

/// Response wrapper for the series API.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

fn status_for(e: &MetricsError) -> StatusCode {
    match e {
        MetricsError::UnregisteredMetric(_) | MetricsError::NoSuchSeries { .. } => {
            StatusCode::NOT_FOUND
        }
        MetricsError::DataCallbackConflict(_) => StatusCode::CONFLICT,
        MetricsError::InvalidMetric(_)
        | MetricsError::InvalidLabel(_)
        | MetricsError::InvalidValue { .. } => StatusCode::BAD_REQUEST,
        MetricsError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn metrics_error(e: MetricsError) -> Response {
    let status = status_for(&e);
    if status.is_server_error() {
        warn!(error = %e, "series request failed");
    }
    error_response(&e.to_string(), status)
}

/// Body of the series update and fetch requests. `value` is required for
/// updates and ignored by fetches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesRequest {
    pub metric: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// One series and its current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesValue {
    pub metric: String,
    /// Canonical label string, empty when unlabeled.
    pub labels: String,
    pub value: String,
}

/// Whether `path` addresses the scrape endpoint: it ends in `/metrics`,
/// optionally followed by one trailing slash.
pub fn is_metrics_path(path: &str) -> bool {
    let path = path.strip_suffix('/').unwrap_or(path);
    path.ends_with("/metrics")
}

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let body = state.exporter.render();
    debug!(bytes = body.len(), "metrics scraped");
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, optex_metrics::CONTENT_TYPE)],
        body,
    )
}

/// PUT /api/v1/series
pub async fn update_series(
    State(state): State<ApiState>,
    Json(req): Json<SeriesRequest>,
) -> Response {
    let Some(value) = req.value else {
        return error_response("missing value", StatusCode::BAD_REQUEST);
    };
    let labels: LabelSet = req.labels.into_iter().collect();
    let result = state
        .exporter
        .series(&req.metric, Some(&labels))
        .and_then(|series| {
            series.update(value.as_str())?;
            Ok(SeriesValue {
                metric: series.name().to_string(),
                labels: series.labels().to_string(),
                value,
            })
        });
    match result {
        Ok(updated) => ApiResponse::ok(updated).into_response(),
        Err(e) => metrics_error(e),
    }
}

/// POST /api/v1/series/fetch
pub async fn fetch_series(
    State(state): State<ApiState>,
    Json(req): Json<SeriesRequest>,
) -> Response {
    let labels: LabelSet = req.labels.into_iter().collect();
    let result = state
        .exporter
        .series(&req.metric, Some(&labels))
        .and_then(|series| {
            Ok(SeriesValue {
                value: series.fetch()?,
                metric: series.name().to_string(),
                labels: series.labels().to_string(),
            })
        });
    match result {
        Ok(found) => ApiResponse::ok(found).into_response(),
        Err(e) => metrics_error(e),
    }
}

/// Scrapes under any prefix; 404 for everything else.
pub async fn fallback(State(state): State<ApiState>, method: Method, uri: Uri) -> Response {
    if method == Method::GET && is_metrics_path(uri.path()) {
        return prometheus_metrics(State(state)).await.into_response();
    }
    StatusCode::NOT_FOUND.into_response()
}
