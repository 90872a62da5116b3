//! Effects produced by state transitions

use super::state::Message;
use crate::answer::AnswerError;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a message to the log
    AppendMessage(Message),

    /// Empty the draft buffer
    ClearInput,

    /// Ask the answering service for a reply (spawns as background task)
    RequestAnswer { utterance: String },

    /// Record a failed answer for operators
    ReportFailure {
        utterance: String,
        error: AnswerError,
    },

    /// Notify connected clients
    NotifyClient,
}

impl Effect {
    pub fn append_user(content: impl Into<String>) -> Self {
        Effect::AppendMessage(Message::user(content))
    }

    pub fn append_assistant(content: impl Into<String>) -> Self {
        Effect::AppendMessage(Message::assistant(content))
    }
}
