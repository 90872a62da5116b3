//! HTTP surface of the demo site
//!
//! Serves the home and chat pages and a small JSON/SSE API the chat page
//! uses to drive its conversation.

mod assets;
mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::runtime::ProductionSessions;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<ProductionSessions>,
}

impl AppState {
    pub fn new(sessions: ProductionSessions) -> Self {
        Self {
            sessions: Arc::new(sessions),
        }
    }
}
