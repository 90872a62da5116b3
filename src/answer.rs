//! Answering service abstraction
//!
//! The conversation only knows this trait; the simulated stub and any real
//! retrieval backend plug in behind it.

mod error;
mod simulated;

pub use error::{AnswerError, AnswerErrorKind};
pub use simulated::{SimulatedAnswerService, DEFAULT_REPLY_TEMPLATE, DEFAULT_SIMULATED_DELAY};

use async_trait::async_trait;
use std::sync::Arc;

/// Turns a user utterance into a reply, asynchronously and fallibly
#[async_trait]
pub trait AnsweringService: Send + Sync {
    async fn answer(&self, utterance: &str) -> Result<String, AnswerError>;

    /// Name used in logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: AnsweringService + ?Sized> AnsweringService for Arc<T> {
    async fn answer(&self, utterance: &str) -> Result<String, AnswerError> {
        (**self).answer(utterance).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Logging wrapper for answering services
pub struct LoggingService {
    inner: Arc<dyn AnsweringService>,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn AnsweringService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl AnsweringService for LoggingService {
    async fn answer(&self, utterance: &str) -> Result<String, AnswerError> {
        let start = std::time::Instant::now();
        let result = self.inner.answer(utterance).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    service = %self.inner.name(),
                    duration_ms = %duration.as_millis(),
                    utterance_chars = utterance.chars().count(),
                    reply_chars = reply.chars().count(),
                    "Answer completed"
                );
            }
            Err(e) => {
                // The session reports the failure itself
                tracing::debug!(
                    service = %self.inner.name(),
                    duration_ms = %duration.as_millis(),
                    kind = e.kind.as_str(),
                    error = %e.message,
                    "Answer failed"
                );
            }
        }

        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
