//! Language-model completion service.
//!
//! The engine treats completions as a replaceable capability behind the
//! [`ChatClient`] trait. The live implementation speaks the OpenAI-compatible
//! chat completions protocol with a global concurrency cap and bounded
//! retries; tests substitute deterministic fakes.

mod client;
mod retry;

pub use client::*;
pub use retry::*;

use crate::error::JudgeResult;

/// One role-tagged message in a completion prompt.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Capability trait for chat completion calls.
///
/// Implementations must be safe to call concurrently; rate limiting and
/// retries are the implementation's concern, not the caller's.
#[async_trait::async_trait]
pub trait ChatClient: Send + Sync {
    /// Run one completion and return the raw assistant text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> JudgeResult<String>;
}
