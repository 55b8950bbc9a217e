use crate::dtos::MintResponse;
use crate::middleware::{QuizForm, ResponseFormat};
use crate::startup::AppState;
use crate::views::MintedPage;
use askama::Template;
use axum::extract::State;
use axum::http::header::HOST;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use service_core::error::AppError;

/// Mint a horse from the submitted quiz answers.
///
/// Always 200 on the happy and the degraded paths: generation and storage
/// failures surface as fallback content, not as errors.
pub async fn mint(
    State(state): State<AppState>,
    format: ResponseFormat,
    headers: HeaderMap,
    QuizForm(answers): QuizForm,
) -> Result<Response, AppError> {
    let base_url = base_url(state.config.public_base_url.as_deref(), &headers);
    let outcome = state.minter.mint(&answers, &base_url).await;

    tracing::info!(
        token_id = %outcome.token_id,
        horse = %outcome.creature.name,
        asset_kind = ?outcome.asset_kind,
        asset_url = outcome.asset_url.as_deref().unwrap_or("-"),
        metadata_url = outcome.metadata_url.as_deref().unwrap_or("-"),
        "Minted horse"
    );

    match format {
        ResponseFormat::Json => Ok(Json(MintResponse::from(outcome)).into_response()),
        ResponseFormat::Html => {
            let page = MintedPage {
                horse: outcome.creature,
                token_id: outcome.token_id.to_string(),
                asset_url: outcome.asset_url,
                metadata_url: outcome.metadata_url,
                permalink: outcome.permalink,
            };
            let html = page.render().map_err(|e| {
                AppError::InternalError(anyhow::Error::new(e).context("render mint result page"))
            })?;
            Ok(Html(html).into_response())
        }
    }
}

/// `PUBLIC_BASE_URL` when configured, else derived from the `Host` header.
pub fn base_url(configured: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(base) = configured {
        return base.trim_end_matches('/').to_string();
    }

    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or("localhost");
    format!("http://{}", host)
}
