//! Bounded fixed-delay retry for image generation.

use crate::services::providers::ProviderError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// How often and how patiently image generation is attempted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRetry {
    /// Total attempts, including the first. Zero is treated as one.
    pub attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for ImageRetry {
    fn default() -> Self {
        Self {
            attempts: 2,
            delay: Duration::from_secs(2),
        }
    }
}

/// Run `f` until it succeeds, fails permanently, or runs out of attempts.
pub async fn retry_provider_call<F, Fut, T>(
    policy: &ImageRetry,
    operation_name: &str,
    f: F,
) -> Result<T, ProviderError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(result) => {
                if attempt > 1 {
                    info!(operation = operation_name, attempt, "Provider call succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if attempt >= attempts || !e.is_transient() => {
                warn!(
                    operation = operation_name,
                    attempt,
                    error = %e,
                    "Provider call failed, giving up"
                );
                return Err(e);
            }
            Err(e) => {
                warn!(
                    operation = operation_name,
                    attempt,
                    error = %e,
                    delay_ms = policy.delay.as_millis() as u64,
                    "Provider call failed, retrying"
                );
                sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(attempts: u32) -> ImageRetry {
        ImageRetry {
            attempts,
            delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_provider_call(&quick(3), "test_op", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProviderError::RateLimited)
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_provider_call(&quick(2), "test_op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::NetworkError("down".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_provider_call(&quick(5), "test_op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::ContentFiltered)
        })
        .await;

        assert!(matches!(result, Err(ProviderError::ContentFiltered)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let calls = AtomicU32::new(0);
        let _ = retry_provider_call(&quick(0), "test_op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ProviderError>(())
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
