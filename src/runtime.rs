//! Runtime for executing conversations
//!
//! Each chat session runs as its own task owning a `Conversation`; the rest
//! of the program talks to it through a cloneable `ConversationHandle`.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;

use crate::answer::{AnsweringService, LoggingService};
use crate::state_machine::{ConvContext, ConversationSnapshot, TransitionError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};

/// Type alias for the session registry used by the server
pub type ProductionSessions = SessionManager<LoggingService>;

/// Commands sent from handles to a running conversation
#[derive(Debug)]
pub enum SessionCommand {
    Submit {
        text: String,
        reply: oneshot::Sender<SubmitOutcome>,
    },
    SetInput {
        text: String,
    },
    Snapshot {
        reply: oneshot::Sender<ConversationSnapshot>,
    },
    Close,
}

/// What became of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// Nothing changed
    Rejected(TransitionError),
}

/// Events sent to connected clients
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Snapshot(ConversationSnapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session is closed")]
    Closed,
}

/// Settings shared by every session a manager creates
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub error_reply: String,
    pub answer_timeout: Option<Duration>,
    /// A session nobody is watching by then is discarded
    pub attach_grace: Duration,
}

/// Handle to interact with a running conversation
#[derive(Clone)]
pub struct ConversationHandle {
    command_tx: mpsc::Sender<SessionCommand>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
}

impl ConversationHandle {
    /// Start a conversation task and return its handle
    pub fn spawn<A>(context: ConvContext, service: Arc<A>, answer_timeout: Option<Duration>) -> Self
    where
        A: AnsweringService + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(64);

        let runtime = ConversationRuntime::new(
            context,
            service,
            command_rx,
            broadcast_tx.clone(),
        )
        .with_answer_timeout(answer_timeout);
        tokio::spawn(runtime.run());

        Self {
            command_tx,
            broadcast_tx,
        }
    }

    pub async fn submit(&self, text: impl Into<String>) -> Result<SubmitOutcome, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Submit {
            text: text.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn set_input(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.send(SessionCommand::SetInput { text: text.into() }).await
    }

    pub async fn snapshot(&self) -> Result<ConversationSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Number of live subscriptions to this conversation
    pub fn watchers(&self) -> usize {
        self.broadcast_tx.receiver_count()
    }

    async fn close(&self) {
        // Already stopped is fine
        let _ = self.command_tx.send(SessionCommand::Close).await;
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

type SessionMap = Arc<RwLock<HashMap<String, ConversationHandle>>>;

/// Remove a session and stop its runtime. Returns false if it was unknown.
async fn discard(sessions: &SessionMap, id: &str, reason: &'static str) -> bool {
    let removed = sessions.write().await.remove(id);
    match removed {
        Some(handle) => {
            handle.close().await;
            tracing::info!(session_id = %id, reason, "Discarded chat session");
            true
        }
        None => false,
    }
}

/// Keeps a session alive while held; dropping it discards the session
///
/// Held by the page's event stream, so a page that goes away without saying
/// so still ends its conversation.
pub struct SessionWatch {
    sessions: SessionMap,
    id: String,
}

impl Drop for SessionWatch {
    fn drop(&mut self) {
        let sessions = Arc::clone(&self.sessions);
        let id = std::mem::take(&mut self.id);
        // No runtime means the process is shutting down
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                discard(&sessions, &id, "stream ended").await;
            });
        }
    }
}

/// Registry of live chat sessions
pub struct SessionManager<A: AnsweringService + 'static> {
    service: Arc<A>,
    settings: SessionSettings,
    sessions: SessionMap,
}

impl<A: AnsweringService + 'static> SessionManager<A> {
    pub fn new(service: A, settings: SessionSettings) -> Self {
        Self {
            service: Arc::new(service),
            settings,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start a fresh, empty conversation
    ///
    /// Unless something subscribes to it within the attach grace, the session
    /// is discarded.
    pub async fn create(&self) -> (String, ConversationHandle) {
        let id = uuid::Uuid::new_v4().to_string();
        let context = ConvContext::new(&id, &self.settings.error_reply);
        let handle = ConversationHandle::spawn(
            context,
            Arc::clone(&self.service),
            self.settings.answer_timeout,
        );

        self.sessions.write().await.insert(id.clone(), handle.clone());
        let live = self.count().await;
        tracing::info!(session_id = %id, live, "Created chat session");

        let sessions = Arc::clone(&self.sessions);
        let grace = self.settings.attach_grace;
        let unattached_id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let unattached = sessions
                .read()
                .await
                .get(&unattached_id)
                .is_some_and(|handle| handle.watchers() == 0);
            if unattached {
                discard(&sessions, &unattached_id, "never attached").await;
            }
        });

        (id, handle)
    }

    pub async fn get(&self, id: &str) -> Option<ConversationHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Look up a session and tie its lifetime to the returned watch
    pub async fn watch(&self, id: &str) -> Option<(ConversationHandle, SessionWatch)> {
        let handle = self.get(id).await?;
        let watch = SessionWatch {
            sessions: Arc::clone(&self.sessions),
            id: id.to_string(),
        };
        Some((handle, watch))
    }

    /// Discard a conversation. Returns false if it was unknown.
    pub async fn close(&self, id: &str) -> bool {
        discard(&self.sessions, id, "closed by client").await
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }
}
