//! Chat completion services
//!
//! Agents talk to a [`ChatService`]; the Gemini adapter, the retry wrapper
//! and the scripted mock all implement it.

pub mod gemini;
pub mod message;
pub mod mock;
pub mod retry;

pub use gemini::GeminiService;
pub use message::{ChatMessage, ContentPart, ImageUrl, MessageContent, Messages, Role};
pub use mock::MockChatService;
pub use retry::Retrying;

use crate::Result;
use async_trait::async_trait;

/// Per-call overrides. Unset values fall back to the configured defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    /// Requested number of completions. Not forwarded to the provider.
    pub n: u32,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            n: 1,
            temperature: None,
            max_tokens: None,
            top_p: None,
        }
    }
}

/// Texts of every returned candidate (`None` when a candidate had no usable
/// text) and the estimated cost of the call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatCompletion {
    pub candidates: Vec<Option<String>>,
    pub cost: f64,
}

impl ChatCompletion {
    pub fn first_text(&self) -> Option<&str> {
        self.candidates.first().and_then(Option::as_deref)
    }
}

#[async_trait]
pub trait ChatService: Send + Sync {
    async fn chat_completion(
        &self,
        messages: Messages,
        options: &CompletionOptions,
    ) -> Result<ChatCompletion>;
}
