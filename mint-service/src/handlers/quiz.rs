use crate::views::QuizPage;
use axum::extract::RawQuery;
use axum::response::IntoResponse;

/// Renders the quiz. A `token` parameter marks the page as opened from a
/// shared link; repeated or malformed parameters never reject the request.
pub async fn quiz_page(RawQuery(query): RawQuery) -> impl IntoResponse {
    QuizPage {
        shared_token: query.as_deref().and_then(shared_token),
    }
}

/// First non-empty `token` value in a query string.
fn shared_token(query: &str) -> Option<String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .unwrap_or_default()
        .into_iter()
        .find(|(key, value)| key == "token" && !value.is_empty())
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_token_keeps_first_non_empty() {
        assert_eq!(shared_token("token=&token=b&token=c").as_deref(), Some("b"));
        assert_eq!(shared_token("token=a&token=b").as_deref(), Some("a"));
    }

    #[test]
    fn missing_or_empty_token_is_none() {
        assert_eq!(shared_token(""), None);
        assert_eq!(shared_token("other=1"), None);
        assert_eq!(shared_token("token="), None);
    }

    #[test]
    fn token_is_percent_decoded() {
        assert_eq!(shared_token("token=a%20b").as_deref(), Some("a b"));
    }
}
