//! Gemini provider implementation.
//!
//! Text goes through `generateContent`; images through the Imagen `predict`
//! endpoint of the same API.

use super::{
    FinishReason, GeneratedImage, GenerationParams, ImageProvider, ProviderError,
    ProviderResponse, TextProvider,
};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Secret<String>,
    pub text_model: String,
    pub image_model: String,
    pub base_url: String,
}

impl GeminiConfig {
    pub fn new(api_key: Secret<String>, text_model: &str, image_model: &str) -> Self {
        Self {
            api_key,
            text_model: text_model.to_string(),
            image_model: image_model.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }
}

/// HTTP plumbing shared by the text and image providers.
#[derive(Clone)]
struct GeminiApi {
    config: GeminiConfig,
    client: Client,
}

impl GeminiApi {
    fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        if config.api_key.expose_secret().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Gemini API key not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn api_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.config.base_url, model, method)
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Response, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", self.config.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }
            if status.as_u16() == 400 {
                return Err(ProviderError::InvalidRequest(error_text));
            }

            return Err(ProviderError::ApiError(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

/// Gemini text provider.
pub struct GeminiTextProvider {
    api: GeminiApi,
}

impl GeminiTextProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            api: GeminiApi::new(config)?,
        })
    }
}

#[async_trait]
impl TextProvider for GeminiTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let model = &self.api.config.text_model;
        let request = content_request(prompt, params);

        tracing::debug!(
            model = %model,
            prompt_len = prompt.len(),
            "Sending request to Gemini API"
        );

        let api_response: GenerateContentResponse = self
            .api
            .post(&self.api.api_url(model, "generateContent"), &request)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        let candidate = api_response.candidates.first();
        let text = candidate
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<String>()
            })
            .filter(|t| !t.is_empty());

        let finish_reason = candidate
            .map(|c| finish_reason(c.finish_reason.as_deref()))
            .unwrap_or(FinishReason::Complete);

        if finish_reason == FinishReason::ContentFilter {
            return Err(ProviderError::ContentFiltered);
        }

        let usage = api_response.usage_metadata.unwrap_or_default();

        Ok(ProviderResponse {
            text,
            input_tokens: usage.prompt_token_count.unwrap_or(0),
            output_tokens: usage.candidates_token_count.unwrap_or(0),
            finish_reason,
        })
    }
}

fn content_request(prompt: &str, params: &GenerationParams) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![ContentPart {
                text: prompt.to_string(),
            }],
        }],
        generation_config: Some(GenerationConfig {
            temperature: params.temperature,
            max_output_tokens: params.max_tokens,
            response_mime_type: params.json_output.then(|| "application/json".to_string()),
        }),
    }
}

fn finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("STOP") | None => FinishReason::Complete,
        Some("MAX_TOKENS") => FinishReason::Length,
        Some("SAFETY") | Some("PROHIBITED_CONTENT") => FinishReason::ContentFilter,
        Some(_) => FinishReason::Error,
    }
}

/// Imagen image provider, reached through the Gemini API key.
pub struct GeminiImageProvider {
    api: GeminiApi,
}

impl GeminiImageProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            api: GeminiApi::new(config)?,
        })
    }
}

#[async_trait]
impl ImageProvider for GeminiImageProvider {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        let model = &self.api.config.image_model;
        let request = PredictRequest {
            instances: vec![PredictInstance { prompt }],
            parameters: PredictParameters { sample_count: 1 },
        };

        tracing::debug!(
            model = %model,
            prompt_len = prompt.len(),
            "Sending image request to Gemini API"
        );

        let api_response: PredictResponse = self
            .api
            .post(&self.api.api_url(model, "predict"), &request)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        decode_prediction(api_response)
    }
}

fn decode_prediction(response: PredictResponse) -> Result<GeneratedImage, ProviderError> {
    // Imagen drops filtered samples instead of flagging them.
    let prediction = response
        .predictions
        .into_iter()
        .find(|p| p.bytes_base64_encoded.is_some())
        .ok_or(ProviderError::ContentFiltered)?;

    let encoded = prediction.bytes_base64_encoded.unwrap_or_default();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| ProviderError::ApiError(format!("Invalid image payload: {}", e)))?;

    Ok(GeneratedImage {
        bytes,
        mime_type: prediction
            .mime_type
            .unwrap_or_else(|| "image/png".to_string()),
    })
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<PredictInstance<'a>>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_not_configured() {
        let config = GeminiConfig::new(Secret::new(String::new()), "gemini-1.5-flash", "imagen");
        assert!(matches!(
            GeminiTextProvider::new(config),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn response_text_joins_parts() {
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"name\":"}, {"text": "\"Kaze\"}"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 7}
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let content = response.candidates[0].content.as_ref().unwrap();
        let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(text, r#"{"name":"Kaze"}"#);
        assert_eq!(
            finish_reason(response.candidates[0].finish_reason.as_deref()),
            FinishReason::Complete
        );
    }

    #[test]
    fn json_output_sets_response_mime_type() {
        let params = GenerationParams {
            temperature: Some(0.7),
            max_tokens: Some(1024),
            json_output: true,
        };
        let body = serde_json::to_value(content_request("hi", &params)).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");

        let plain = serde_json::to_value(content_request("hi", &GenerationParams::default())).unwrap();
        assert!(plain["generationConfig"].get("responseMimeType").is_none());
        assert!(plain["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn safety_finish_reason_is_content_filter() {
        assert_eq!(finish_reason(Some("SAFETY")), FinishReason::ContentFilter);
        assert_eq!(finish_reason(Some("MAX_TOKENS")), FinishReason::Length);
        assert_eq!(finish_reason(Some("RECITATION")), FinishReason::Error);
    }

    #[test]
    fn prediction_is_base64_decoded() {
        let raw = r#"{"predictions":[{"bytesBase64Encoded":"iVBORw==","mimeType":"image/png"}]}"#;
        let image = decode_prediction(serde_json::from_str(raw).unwrap()).unwrap();
        assert_eq!(image.bytes, vec![0x89, b'P', b'N', b'G']);
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn empty_predictions_are_treated_as_filtered() {
        let raw = r#"{"predictions":[]}"#;
        assert!(matches!(
            decode_prediction(serde_json::from_str(raw).unwrap()),
            Err(ProviderError::ContentFiltered)
        ));
    }
}
