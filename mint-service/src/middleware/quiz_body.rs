use crate::models::QuizAnswers;
use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use std::collections::HashMap;
use std::convert::Infallible;

/// Quiz answers decoded from a form or JSON body.
///
/// `application/x-www-form-urlencoded` bodies are decoded as a form,
/// anything else as JSON. This never rejects: an unreadable or malformed
/// body yields empty answers and the mint proceeds with defaults.
#[derive(Debug, Clone, Default)]
pub struct QuizForm(pub QuizAnswers);

impl QuizForm {
    pub fn decode(content_type: Option<&str>, body: &[u8]) -> QuizAnswers {
        if is_form(content_type) {
            return match serde_urlencoded::from_bytes::<HashMap<String, String>>(body) {
                Ok(fields) => QuizAnswers::from_form(fields),
                Err(e) => {
                    tracing::debug!(error = %e, "Malformed form body, using empty answers");
                    QuizAnswers::default()
                }
            };
        }

        if body.is_empty() {
            return QuizAnswers::default();
        }
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(value) => QuizAnswers::from_json(&value),
            Err(e) => {
                tracing::debug!(error = %e, "Malformed JSON body, using empty answers");
                QuizAnswers::default()
            }
        }
    }
}

fn is_form(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
        .unwrap_or(false)
}

#[async_trait]
impl<S> FromRequest<S> for QuizForm
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = match Bytes::from_request(req, state).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read quiz body, using empty answers");
                return Ok(QuizForm::default());
            }
        };

        Ok(QuizForm(Self::decode(content_type.as_deref(), &body)))
    }
}
