//! Events that can occur in a conversation

use crate::answer::AnswerError;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Submit { text: String },

    // Answering service events
    ReplyReceived { reply: String },
    ReplyFailed { error: AnswerError },
}

impl Event {
    pub fn submit(text: impl Into<String>) -> Self {
        Event::Submit { text: text.into() }
    }

    /// Settle the in-flight request with the service outcome
    pub fn settled(outcome: Result<String, AnswerError>) -> Self {
        match outcome {
            Ok(reply) => Event::ReplyReceived { reply },
            Err(error) => Event::ReplyFailed { error },
        }
    }
}
