//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{
    ConvContext, ConvState, Conversation, ConversationSnapshot, Message, Role,
    DEFAULT_ERROR_REPLY,
};
pub use transition::{transition, TransitionError};
