//! Conversation state types

use serde::{Deserialize, Serialize};

/// Default apology shown in place of a reply when the answering service fails
pub const DEFAULT_ERROR_REPLY: &str = "Sorry, there was an error processing your request.";

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single utterance in the conversation log
///
/// Messages are append-only: once pushed onto a [`Conversation`] they are
/// never edited or removed. Identity is the index in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Conversation state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConvState {
    /// Ready for a submission
    #[default]
    Idle,

    /// A user message was accepted and its reply has not settled yet
    AwaitingReply {
        /// The accepted text, kept for diagnostics
        utterance: String,
    },
}

impl ConvState {
    /// True while a request is in flight
    pub fn is_pending(&self) -> bool {
        matches!(self, ConvState::AwaitingReply { .. })
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ConvState::Idle => "idle",
            ConvState::AwaitingReply { .. } => "awaiting_reply",
        }
    }
}

/// Read-only per-session data consulted by transitions
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub session_id: String,
    /// Assistant text appended when the answering service fails
    pub error_reply: String,
}

impl ConvContext {
    pub fn new(session_id: impl Into<String>, error_reply: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            error_reply: error_reply.into(),
        }
    }
}

/// Serializable view of a conversation, consumed by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    pub pending: bool,
    pub input: String,
}

/// The conversation owned by one chat session
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    input: String,
    state: ConvState,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[allow(dead_code)] // Read through snapshots outside tests
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn state(&self) -> &ConvState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    /// Replace the draft buffer (keystroke updates from the presentation layer)
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            messages: self.messages.clone(),
            pending: self.is_pending(),
            input: self.input.clone(),
        }
    }

    pub(super) fn set_state(&mut self, state: ConvState) {
        self.state = state;
    }

    pub(super) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(super) fn clear_input(&mut self) {
        self.input.clear();
    }
}
