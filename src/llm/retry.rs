//! Opt-in retry wrapper for any [`ChatService`].

use super::{ChatCompletion, ChatService, CompletionOptions, Messages};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio_retry::strategy::{jitter, FixedInterval};
use tokio_retry::RetryIf;
use tracing::warn;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Retries transient failures of the wrapped service.
///
/// Only errors for which [`Error::is_transient`] holds are retried; invalid
/// requests fail on the first attempt.
pub struct Retrying<S> {
    inner: S,
    max_retry: usize,
    interval: Duration,
}

impl<S: ChatService> Retrying<S> {
    /// `max_retry` counts extra attempts after the first call.
    pub fn new(inner: S, max_retry: u32) -> Self {
        Self {
            inner,
            max_retry: max_retry as usize,
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Base delay between attempts; each delay is jittered below it.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ChatService> ChatService for Retrying<S> {
    async fn chat_completion(
        &self,
        messages: Messages,
        options: &CompletionOptions,
    ) -> Result<ChatCompletion> {
        let strategy = FixedInterval::new(self.interval)
            .map(jitter)
            .take(self.max_retry);

        let inner = &self.inner;
        let messages = &messages;

        RetryIf::start(
            strategy,
            || async move {
                inner
                    .chat_completion(messages.clone(), options)
                    .await
                    .map_err(|e| {
                        if e.is_transient() {
                            warn!("Chat completion attempt failed: {}. Will retry...", e);
                        }
                        e
                    })
            },
            Error::is_transient,
        )
        .await
    }
}
