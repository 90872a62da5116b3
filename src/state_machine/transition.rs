//! Pure state transition function
//!
//! `transition` decides; `Conversation::handle` applies the local half of the
//! decision and hands the rest back to the runtime.

use super::{ConvContext, ConvState, Conversation, Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Reasons an event is refused. A refused event changes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A reply is still pending")]
    ReplyPending,
    #[error("No request is pending")]
    NoPendingRequest,
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
pub fn transition(
    state: &ConvState,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Blank drafts never reach the log, whatever the state
        (_, Event::Submit { text }) if text.trim().is_empty() => Err(TransitionError::EmptyMessage),

        // Idle + Submit -> AwaitingReply
        (ConvState::Idle, Event::Submit { text }) => {
            Ok(TransitionResult::new(ConvState::AwaitingReply {
                utterance: text.clone(),
            })
            .with_effect(Effect::append_user(text.clone()))
            .with_effect(Effect::ClearInput)
            .with_effect(Effect::RequestAnswer { utterance: text })
            .with_effect(Effect::NotifyClient))
        }

        // One request in flight per conversation; no queueing
        (ConvState::AwaitingReply { .. }, Event::Submit { .. }) => {
            Err(TransitionError::ReplyPending)
        }

        (ConvState::AwaitingReply { .. }, Event::ReplyReceived { reply }) => {
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::append_assistant(reply))
                .with_effect(Effect::NotifyClient))
        }

        (ConvState::AwaitingReply { utterance }, Event::ReplyFailed { error }) => {
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::ReportFailure {
                    utterance: utterance.clone(),
                    error,
                })
                .with_effect(Effect::append_assistant(context.error_reply.clone()))
                .with_effect(Effect::NotifyClient))
        }

        (ConvState::Idle, Event::ReplyReceived { .. } | Event::ReplyFailed { .. }) => {
            Err(TransitionError::NoPendingRequest)
        }
    }
}

impl Conversation {
    /// Run `event` through the state machine and apply its local effects.
    ///
    /// Returns the effects that need the outside world, in order. On error
    /// the conversation is left exactly as it was.
    pub fn handle(
        &mut self,
        context: &ConvContext,
        event: Event,
    ) -> Result<Vec<Effect>, TransitionError> {
        let result = transition(self.state(), context, event)?;
        self.set_state(result.new_state);

        let mut external = Vec::with_capacity(result.effects.len());
        for effect in result.effects {
            match effect {
                Effect::AppendMessage(message) => self.push(message),
                Effect::ClearInput => self.clear_input(),
                other => external.push(other),
            }
        }
        Ok(external)
    }
}
