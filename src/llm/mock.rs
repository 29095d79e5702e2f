use super::{ChatCompletion, ChatService, CompletionOptions, ContentPart, MessageContent, Messages};
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Scripted [`ChatService`] for tests and harnesses.
///
/// Queued outcomes are returned in order. Once the queue is drained every
/// call echoes the last text of the conversation at zero cost.
pub struct MockChatService {
    outcomes: Arc<Mutex<VecDeque<Result<ChatCompletion>>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockChatService {
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_response(self, completion: ChatCompletion) -> Self {
        self.push(Ok(completion));
        self
    }

    pub fn with_text_response(self, text: impl Into<String>) -> Self {
        self.with_response(ChatCompletion {
            candidates: vec![Some(text.into())],
            cost: 0.0,
        })
    }

    pub fn with_error(self, error: crate::Error) -> Self {
        self.push(Err(error));
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self
            .call_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, outcome: Result<ChatCompletion>) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    fn echo(messages: &Messages) -> ChatCompletion {
        let last_text = messages
            .as_slice()
            .iter()
            .rev()
            .find_map(|message| match &message.content {
                MessageContent::Text(text) => Some(text.clone()),
                MessageContent::Parts(parts) => parts.iter().rev().find_map(|part| match part {
                    ContentPart::Text { text } => Some(text.clone()),
                    _ => None,
                }),
            });

        ChatCompletion {
            candidates: vec![last_text],
            cost: 0.0,
        }
    }
}

impl Default for MockChatService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatService for MockChatService {
    async fn chat_completion(
        &self,
        messages: Messages,
        _options: &CompletionOptions,
    ) -> Result<ChatCompletion> {
        *self
            .call_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;

        let next = self
            .outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        next.unwrap_or_else(|| Ok(Self::echo(&messages)))
    }
}
