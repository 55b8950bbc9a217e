use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::ACCEPT;
use axum::http::request::Parts;
use std::convert::Infallible;

/// Representation the client asked for through `Accept`.
///
/// Only `text/html` and `application/json` compete. The higher q-value
/// wins; on a tie the one listed first wins. No header, or a header naming
/// neither, means JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Html,
}

impl ResponseFormat {
    pub fn from_accept(header: Option<&str>) -> Self {
        let Some(header) = header else {
            return ResponseFormat::Json;
        };

        // (q, position) of the best entry per format
        let mut html: Option<(f32, usize)> = None;
        let mut json: Option<(f32, usize)> = None;

        for (position, entry) in header.split(',').enumerate() {
            let mut parts = entry.split(';');
            let media = parts.next().unwrap_or("").trim().to_ascii_lowercase();
            let q = parts
                .find_map(|p| {
                    let (k, v) = p.split_once('=')?;
                    if k.trim().eq_ignore_ascii_case("q") {
                        v.trim().parse::<f32>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(1.0);

            let slot = match media.as_str() {
                "text/html" => &mut html,
                "application/json" => &mut json,
                _ => continue,
            };
            if slot.map_or(true, |(best, _)| q > best) {
                *slot = Some((q, position));
            }
        }

        match (html, json) {
            (Some((hq, _)), _) if hq <= 0.0 => ResponseFormat::Json,
            (Some(_), None) => ResponseFormat::Html,
            (Some((hq, hp)), Some((jq, jp))) if hq > jq || (hq == jq && hp < jp) => {
                ResponseFormat::Html
            }
            _ => ResponseFormat::Json,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ResponseFormat
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(ACCEPT).and_then(|v| v.to_str().ok());
        Ok(ResponseFormat::from_accept(header))
    }
}
