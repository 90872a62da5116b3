//! Stand-in answering service used until a retrieval backend exists

use super::{AnswerError, AnsweringService};
use async_trait::async_trait;
use std::time::Duration;

/// Placeholder replaced by the user's utterance in a reply template
pub const UTTERANCE_PLACEHOLDER: &str = "{utterance}";

pub const DEFAULT_REPLY_TEMPLATE: &str = "This is a simulated response to: \"{utterance}\"";

pub const DEFAULT_SIMULATED_DELAY: Duration = Duration::from_millis(1000);

/// Waits a fixed delay, then echoes the utterance through a template
#[derive(Debug, Clone)]
pub struct SimulatedAnswerService {
    delay: Duration,
    template: String,
}

impl SimulatedAnswerService {
    pub fn new(delay: Duration, template: impl Into<String>) -> Self {
        Self {
            delay,
            template: template.into(),
        }
    }

    pub fn render(&self, utterance: &str) -> String {
        self.template.replace(UTTERANCE_PLACEHOLDER, utterance)
    }
}

impl Default for SimulatedAnswerService {
    fn default() -> Self {
        Self::new(DEFAULT_SIMULATED_DELAY, DEFAULT_REPLY_TEMPLATE)
    }
}

#[async_trait]
impl AnsweringService for SimulatedAnswerService {
    async fn answer(&self, utterance: &str) -> Result<String, AnswerError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.render(utterance))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
