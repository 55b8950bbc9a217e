//! Mock provider implementations for testing.

use super::{
    FinishReason, GeneratedImage, GenerationParams, ImageProvider, ProviderError,
    ProviderResponse, TextProvider,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mock text provider that replies with a fixed string or always fails.
///
/// The parameters of the latest call are kept for inspection.
pub struct MockTextProvider {
    reply: Option<String>,
    finish_reason: FinishReason,
    calls: AtomicUsize,
    last_params: Mutex<Option<GenerationParams>>,
}

impl MockTextProvider {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self::with_reply(Some(reply.into()), FinishReason::Complete)
    }

    /// Replies as if the output token limit was reached.
    pub fn truncated(reply: impl Into<String>) -> Self {
        Self::with_reply(Some(reply.into()), FinishReason::Length)
    }

    pub fn failing() -> Self {
        Self::with_reply(None, FinishReason::Error)
    }

    fn with_reply(reply: Option<String>, finish_reason: FinishReason) -> Self {
        Self {
            reply,
            finish_reason,
            calls: AtomicUsize::new(0),
            last_params: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<GenerationParams> {
        self.last_params
            .lock()
            .map(|params| params.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_params.lock() {
            *last = Some(params.clone());
        }

        let Some(reply) = &self.reply else {
            return Err(ProviderError::NetworkError(
                "mock text provider unreachable".to_string(),
            ));
        };

        Ok(ProviderResponse {
            text: Some(reply.clone()),
            input_tokens: prompt.len() as i32 / 4,
            output_tokens: reply.len() as i32 / 4,
            finish_reason: self.finish_reason,
        })
    }
}

/// Mock image provider that fails a set number of times before returning
/// fixed PNG bytes.
pub struct MockImageProvider {
    failures_before_success: usize,
    bytes: Option<Vec<u8>>,
    calls: AtomicUsize,
}

impl MockImageProvider {
    pub fn returning(bytes: Vec<u8>) -> Self {
        Self::flaky(0, bytes)
    }

    pub fn flaky(failures_before_success: usize, bytes: Vec<u8>) -> Self {
        Self {
            failures_before_success,
            bytes: Some(bytes),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            failures_before_success: usize::MAX,
            bytes: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    async fn generate(&self, _prompt: &str) -> Result<GeneratedImage, ProviderError> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.bytes {
            Some(bytes) if attempt >= self.failures_before_success => Ok(GeneratedImage {
                bytes: bytes.clone(),
                mime_type: "image/png".to_string(),
            }),
            _ => Err(ProviderError::RateLimited),
        }
    }
}
