use axum::http::StatusCode;
use axum::response::IntoResponse;

pub async fn root() -> &'static str {
    "System Alive ✅"
}

/// Liveness check.
pub async fn health_check() -> &'static str {
    "ok"
}

/// Always fails; used to exercise error alerting end to end.
pub async fn intentional_error() -> impl IntoResponse {
    tracing::error!(route = "/error", "Intentional error requested");
    (StatusCode::INTERNAL_SERVER_ERROR, "intentional error")
}
