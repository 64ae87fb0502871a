use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::AppState;

/// GET /metrics in Prometheus text format.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed\n".to_string()),
    }
}
