//! Runtime configuration from environment variables

use crate::answer::{DEFAULT_REPLY_TEMPLATE, DEFAULT_SIMULATED_DELAY};
use crate::state_machine::DEFAULT_ERROR_REPLY;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;

/// How long a new session may go without an event stream before it is discarded
pub const DEFAULT_ATTACH_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Configuration for the site and its chat sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub port: u16,
    /// Reply template for the simulated service, `{utterance}` is substituted
    pub reply_template: String,
    /// Assistant text shown when answering fails
    pub error_reply: String,
    pub simulated_delay: Duration,
    /// Settle unanswered requests as failures after this long. `None` waits forever.
    pub answer_timeout: Option<Duration>,
    pub attach_grace: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            reply_template: DEFAULT_REPLY_TEMPLATE.to_string(),
            error_reply: DEFAULT_ERROR_REPLY.to_string(),
            simulated_delay: DEFAULT_SIMULATED_DELAY,
            answer_timeout: None,
            attach_grace: DEFAULT_ATTACH_GRACE,
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = parse_number(&lookup, "LAWCHAT_PORT")?.unwrap_or(defaults.port);
        let simulated_delay = parse_number(&lookup, "LAWCHAT_SIMULATED_DELAY_MS")?
            .map_or(defaults.simulated_delay, Duration::from_millis);
        let answer_timeout =
            parse_number(&lookup, "LAWCHAT_ANSWER_TIMEOUT_MS")?.map(Duration::from_millis);
        let attach_grace = parse_number(&lookup, "LAWCHAT_ATTACH_GRACE_MS")?
            .map_or(defaults.attach_grace, Duration::from_millis);

        Ok(Self {
            port,
            reply_template: lookup("LAWCHAT_REPLY_TEMPLATE").unwrap_or(defaults.reply_template),
            error_reply: lookup("LAWCHAT_ERROR_REPLY").unwrap_or(defaults.error_reply),
            simulated_delay,
            answer_timeout,
            attach_grace,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}
