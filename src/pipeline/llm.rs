//! The generation collaborator: inline parts + instruction → raw guide text.
//!
//! [`GenerationCollaborator`] is the seam between the pipeline and whatever
//! model writes the guide. [`LlmCollaborator`] is the production
//! implementation over an `edgequake-llm` provider; tests plug in scripted
//! fakes.
//!
//! ## Retry Strategy
//!
//! Busy or unreachable backends (HTTP 429 / 503, dropped connections) are
//! transient. [`generate_with_retry`] wraps every attempt in a timeout and
//! waits `retry_backoff_ms * 2^(attempt-1)` between attempts: with 500 ms
//! base and 3 retries the waits are 500 ms → 1 s → 2 s. When every attempt
//! fails the caller gets [`GuideError::GenerationFailed`] and no partial text.

use crate::config::GuideConfig;
use crate::error::GuideError;
use crate::pipeline::encode::MediaPart;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Raw model output plus token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Something that turns inline media and an instruction into guide text.
///
/// Order matters: parts are passed in the order the caller listed the inputs.
#[async_trait]
pub trait GenerationCollaborator: Send + Sync {
    async fn generate(
        &self,
        parts: &[MediaPart],
        instruction: &str,
    ) -> Result<Generation, GuideError>;
}

/// [`GenerationCollaborator`] over an `edgequake-llm` provider.
///
/// Sends a single user message: the instruction as text with every part
/// attached inline.
pub struct LlmCollaborator {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmCollaborator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &GuideConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }
}

#[async_trait]
impl GenerationCollaborator for LlmCollaborator {
    async fn generate(
        &self,
        parts: &[MediaPart],
        instruction: &str,
    ) -> Result<Generation, GuideError> {
        let attachments = parts.iter().map(MediaPart::to_image_data).collect();
        let messages = vec![ChatMessage::user_with_images(instruction, attachments)];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| GuideError::GenerationFailed {
                attempts: 1,
                detail: e.to_string(),
            })?;

        Ok(Generation {
            text: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

/// Build `CompletionOptions` from the guide config.
fn build_options(config: &GuideConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Knobs for [`generate_with_retry`], taken from [`GuideConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub timeout_secs: u64,
}

impl From<&GuideConfig> for RetryPolicy {
    fn from(c: &GuideConfig) -> Self {
        Self {
            max_retries: c.max_retries,
            backoff_ms: c.retry_backoff_ms,
            timeout_secs: c.api_timeout_secs,
        }
    }
}

/// Call the collaborator until it answers or the retries run out.
///
/// Returns the generation and how many retries it took.
pub async fn generate_with_retry(
    collaborator: &dyn GenerationCollaborator,
    parts: &[MediaPart],
    instruction: &str,
    policy: RetryPolicy,
) -> Result<(Generation, u32), GuideError> {
    let start = Instant::now();
    let mut last_err: Option<GuideError> = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let backoff = policy.backoff_ms.saturating_mul(2u64.saturating_pow(attempt - 1));
            warn!(
                "Generation: retry {}/{} after {}ms",
                attempt, policy.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let call = collaborator.generate(parts, instruction);
        match timeout(Duration::from_secs(policy.timeout_secs), call).await {
            Ok(Ok(generation)) => {
                debug!(
                    "Generation: {} input tokens, {} output tokens, {:?}",
                    generation.input_tokens,
                    generation.output_tokens,
                    start.elapsed()
                );
                return Ok((generation, attempt));
            }
            Ok(Err(e)) => {
                warn!("Generation: attempt {} failed — {}", attempt + 1, e);
                last_err = Some(e);
            }
            Err(_) => {
                warn!(
                    "Generation: attempt {} timed out after {}s",
                    attempt + 1,
                    policy.timeout_secs
                );
                last_err = Some(GuideError::GenerationTimeout {
                    secs: policy.timeout_secs,
                });
            }
        }
    }

    let attempts = policy.max_retries + 1;
    Err(match last_err {
        Some(GuideError::GenerationTimeout { secs }) => GuideError::GenerationTimeout { secs },
        Some(GuideError::GenerationFailed { detail, .. }) => {
            GuideError::GenerationFailed { attempts, detail }
        }
        Some(other) => GuideError::GenerationFailed {
            attempts,
            detail: other.to_string(),
        },
        None => GuideError::GenerationFailed {
            attempts,
            detail: "Unknown error".to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `failures` times, then answers.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl GenerationCollaborator for Flaky {
        async fn generate(
            &self,
            parts: &[MediaPart],
            instruction: &str,
        ) -> Result<Generation, GuideError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(GuideError::GenerationFailed {
                    attempts: 1,
                    detail: "503 Service Unavailable".into(),
                });
            }
            Ok(Generation {
                text: format!("{} partes | {}", parts.len(), instruction),
                input_tokens: 10,
                output_tokens: 20,
            })
        }
    }

    struct Slow;

    #[async_trait]
    impl GenerationCollaborator for Slow {
        async fn generate(&self, _: &[MediaPart], _: &str) -> Result<Generation, GuideError> {
            sleep(Duration::from_secs(3600)).await;
            Ok(Generation::default())
        }
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_ms: 1,
            timeout_secs: 5,
        }
    }

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&GuideConfig::default());
        assert_eq!(opts.temperature, Some(0.4));
        assert_eq!(opts.max_tokens, Some(8192));
    }

    #[test]
    fn retry_policy_from_config() {
        let c = GuideConfig::builder()
            .max_retries(5)
            .retry_backoff_ms(10)
            .api_timeout_secs(30)
            .build()
            .unwrap();
        assert_eq!(
            RetryPolicy::from(&c),
            RetryPolicy { max_retries: 5, backoff_ms: 10, timeout_secs: 30 }
        );
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let flaky = Flaky { failures: 2, calls: AtomicU32::new(0) };
        let (generation, retries) = generate_with_retry(&flaky, &[], "Hazlo", policy(3))
            .await
            .unwrap();
        assert_eq!(retries, 2);
        assert_eq!(generation.text, "0 partes | Hazlo");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_at_max_retries() {
        let flaky = Flaky { failures: u32::MAX, calls: AtomicU32::new(0) };
        let err = generate_with_retry(&flaky, &[], "x", policy(2)).await.unwrap_err();
        assert!(matches!(err, GuideError::GenerationFailed { attempts: 3, .. }));
        assert!(err.to_string().contains("503"));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_times_out() {
        let err = generate_with_retry(&Slow, &[], "x", policy(1)).await.unwrap_err();
        assert!(matches!(err, GuideError::GenerationTimeout { secs: 5 }));
        assert!(err.is_retryable());
    }
}
