use crate::startup::AppState;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use service_core::error::AppError;

/// Prometheus exposition with a fresh latency sample on every scrape.
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state
        .metrics
        .sample()
        .map_err(|e| AppError::InternalError(anyhow::Error::new(e).context("encode metrics")))?;

    Ok(([(CONTENT_TYPE, state.metrics.content_type())], body))
}
