//! API request and response types

use crate::runtime::SubmitOutcome;
use crate::state_machine::ConversationSnapshot;
use serde::{Deserialize, Serialize};

/// Request carrying the draft or the text to submit
#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

/// Response for session creation
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub snapshot: ConversationSnapshot,
}

/// Response for a submission
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<SubmitOutcome> for SubmitResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Accepted => Self {
                accepted: true,
                reason: None,
            },
            SubmitOutcome::Rejected(e) => Self {
                accepted: false,
                reason: Some(e.to_string()),
            },
        }
    }
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub answering_service: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
