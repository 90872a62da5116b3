//! Answering service error types

use std::time::Duration;
use thiserror::Error;

/// Answering service failure with classification
///
/// The conversation treats every kind the same way; the kind only feeds
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AnswerError {
    pub kind: AnswerErrorKind,
    pub message: String,
}

impl AnswerError {
    pub fn new(kind: AnswerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The service call ended without a reply
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(AnswerErrorKind::Failed, message)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            AnswerErrorKind::Timeout,
            format!("No answer within {}ms", after.as_millis()),
        )
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerErrorKind {
    /// The service rejected the request or its task died
    Failed,
    /// No answer within the configured timeout
    Timeout,
}

impl AnswerErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        }
    }
}
