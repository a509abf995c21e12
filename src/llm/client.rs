//! OpenAI-compatible chat completion client.
//!
//! All calls pass through one counting semaphore so the whole process
//! respects the provider's rate limits; callers block on the permit rather
//! than dropping work. Rate-limited and transient failures retry under the
//! configured [`RetryPolicy`]; exhaustion surfaces as a typed error on that
//! single call.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::config::LlmConfig;
use crate::error::{JudgeError, JudgeResult};
use crate::llm::{ChatClient, ChatMessage, RetryPolicy};

/// Request body for the chat completions endpoint.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

/// Response body from the chat completions endpoint.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Live completion client.
pub struct OpenAiChatClient {
    http: Client,
    config: LlmConfig,
    retry: RetryPolicy,
    limiter: Arc<Semaphore>,
}

impl OpenAiChatClient {
    /// Build a client from injected configuration.
    pub fn new(config: LlmConfig) -> JudgeResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| JudgeError::Config(format!("failed to build HTTP client: {e}")))?;

        let retry = RetryPolicy::new(config.max_retries, config.backoff_base_ms);
        let limiter = Arc::new(Semaphore::new(config.max_concurrency.max(1)));

        Ok(Self {
            http,
            config,
            retry,
            limiter,
        })
    }

    async fn send_once(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, AttemptError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature,
            max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AttemptError::Retryable(format!("request timed out: {e}"))
                } else {
                    AttemptError::Retryable(format!("transport error: {e}"))
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Retryable(format!("API error {status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Fatal(format!("API error {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::Fatal(format!("failed to parse response: {e}")))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

enum AttemptError {
    /// Rate limit, server error, or transport fault; worth another attempt.
    Retryable(String),
    /// Malformed request or response; retrying cannot help.
    Fatal(String),
}

#[async_trait::async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> JudgeResult<String> {
        // Blocks until a permit is free; never drops work.
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| JudgeError::Internal("completion limiter closed".to_string()))?;

        let mut attempt = 0;
        loop {
            match self.send_once(messages, temperature, max_tokens).await {
                Ok(text) => return Ok(text),
                Err(AttemptError::Fatal(msg)) => return Err(JudgeError::Completion(msg)),
                Err(AttemptError::Retryable(msg)) => {
                    if !self.retry.should_retry(attempt) {
                        tracing::warn!(
                            attempts = attempt + 1,
                            error = %msg,
                            "Completion retries exhausted"
                        );
                        return Err(JudgeError::RateLimited {
                            attempts: attempt + 1,
                        });
                    }
                    let delay = self.retry.delay(attempt);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %msg,
                        "Retrying completion call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
