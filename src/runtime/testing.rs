//! Mock implementations for testing
//!
//! These mocks drive conversations without the simulated delay.

use super::{
    ConversationHandle, SessionError, SessionEvent, SessionManager, SessionSettings, SubmitOutcome,
};
use crate::answer::{AnswerError, AnsweringService};
use crate::state_machine::{ConvContext, ConversationSnapshot, TransitionError, DEFAULT_ERROR_REPLY};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify, Semaphore};

// ============================================================================
// Mock Answering Service
// ============================================================================

/// Mock service that returns queued outcomes
pub struct MockAnsweringService {
    outcomes: Mutex<VecDeque<Result<String, AnswerError>>>,
    /// Record of all utterances asked
    pub utterances: Mutex<Vec<String>>,
}

impl MockAnsweringService {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            utterances: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_reply(&self, reply: impl Into<String>) {
        self.outcomes.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn queue_error(&self, error: AnswerError) {
        self.outcomes.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_utterances(&self) -> Vec<String> {
        self.utterances.lock().unwrap().clone()
    }

    fn next(&self, utterance: &str) -> Result<String, AnswerError> {
        self.utterances.lock().unwrap().push(utterance.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AnswerError::failed("No mock outcome queued")))
    }
}

impl Default for MockAnsweringService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnsweringService for MockAnsweringService {
    async fn answer(&self, utterance: &str) -> Result<String, AnswerError> {
        self.next(utterance)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Gated Mock Answering Service (for in-flight testing)
// ============================================================================

/// Mock service that holds every answer until the test releases it
pub struct GatedAnsweringService {
    inner: MockAnsweringService,
    gate: Semaphore,
    /// Notified when a request starts
    pub request_started: Notify,
}

impl GatedAnsweringService {
    pub fn new() -> Self {
        Self {
            inner: MockAnsweringService::new(),
            gate: Semaphore::new(0),
            request_started: Notify::new(),
        }
    }

    pub fn queue_reply(&self, reply: impl Into<String>) {
        self.inner.queue_reply(reply);
    }

    /// Let one waiting answer through
    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }

    pub fn recorded_utterances(&self) -> Vec<String> {
        self.inner.recorded_utterances()
    }
}

#[async_trait]
impl AnsweringService for GatedAnsweringService {
    async fn answer(&self, utterance: &str) -> Result<String, AnswerError> {
        self.request_started.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| AnswerError::failed("gate closed"))?;
        permit.forget();
        self.inner.next(utterance)
    }

    fn name(&self) -> &str {
        "gated"
    }
}

/// Service whose answer task panics
pub struct PanickingAnsweringService;

#[async_trait]
impl AnsweringService for PanickingAnsweringService {
    async fn answer(&self, _utterance: &str) -> Result<String, AnswerError> {
        panic!("answering backend blew up")
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

// ============================================================================
// Test Session Builder
// ============================================================================

/// A running conversation plus a subscription to its updates
pub struct TestSession {
    pub handle: ConversationHandle,
    events: broadcast::Receiver<SessionEvent>,
}

impl TestSession {
    pub fn spawn<A: AnsweringService + 'static>(service: Arc<A>) -> Self {
        Self::spawn_with_timeout(service, None)
    }

    pub fn spawn_with_timeout<A: AnsweringService + 'static>(
        service: Arc<A>,
        answer_timeout: Option<Duration>,
    ) -> Self {
        let context = ConvContext::new("test-session", DEFAULT_ERROR_REPLY);
        let handle = ConversationHandle::spawn(context, service, answer_timeout);
        let events = handle.subscribe();
        Self { handle, events }
    }

    /// Wait until a broadcast snapshot shows no request in flight
    pub async fn wait_for_idle(&mut self, timeout: Duration) -> Option<ConversationSnapshot> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Ok(SessionEvent::Snapshot(snapshot))) if !snapshot.pending => {
                    return Some(snapshot)
                }
                Ok(Ok(_) | Err(broadcast::error::RecvError::Lagged(_))) => continue,
                _ => return None,
            }
        }
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::LoggingService;
    use crate::state_machine::Message;
    use tracing::Level;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::util::SubscriberInitExt;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_mock_answering_service() {
        let mock = MockAnsweringService::new();
        mock.queue_reply("Hello");

        assert_eq!(mock.answer("hi").await.unwrap(), "Hello");
        // Second call should fail (nothing queued)
        assert!(mock.answer("again").await.is_err());
        assert_eq!(mock.recorded_utterances(), vec!["hi", "again"]);
    }

    /// Submit, observe the pending state, then the reply
    #[tokio::test]
    async fn test_reply_settles_conversation() {
        let service = Arc::new(GatedAnsweringService::new());
        service.queue_reply("This is a simulated response to: \"What is labor law?\"");
        let mut session = TestSession::spawn(Arc::clone(&service));

        session.handle.set_input("What is labor law?").await.unwrap();
        let outcome = session.handle.submit("What is labor law?").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Accepted);

        let snap = session.handle.snapshot().await.unwrap();
        assert_eq!(snap.messages, vec![Message::user("What is labor law?")]);
        assert!(snap.pending);
        assert_eq!(snap.input, "");

        service.release_one();
        let snap = session.wait_for_idle(WAIT).await.expect("reply never arrived");
        assert_eq!(
            snap.messages,
            vec![
                Message::user("What is labor law?"),
                Message::assistant("This is a simulated response to: \"What is labor law?\""),
            ]
        );
        assert!(!snap.pending);
    }

    #[tokio::test]
    async fn test_service_failure_becomes_apology() {
        let service = Arc::new(MockAnsweringService::new());
        service.queue_error(AnswerError::failed("connection refused"));
        let mut session = TestSession::spawn(Arc::clone(&service));

        let outcome = session.handle.submit("What is labor law?").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Accepted);

        let snap = session.wait_for_idle(WAIT).await.expect("failure never settled");
        assert_eq!(
            snap.messages,
            vec![
                Message::user("What is labor law?"),
                Message::assistant("Sorry, there was an error processing your request."),
            ]
        );

        // Submission works again after a failure
        service.queue_reply("second try");
        session.handle.submit("again").await.unwrap();
        let snap = session.wait_for_idle(WAIT).await.unwrap();
        assert_eq!(snap.messages.len(), 4);
        assert_eq!(snap.messages[3], Message::assistant("second try"));
    }

    #[tokio::test]
    async fn test_blank_submit_changes_nothing() {
        let service = Arc::new(MockAnsweringService::new());
        let session = TestSession::spawn(Arc::clone(&service));
        session.handle.set_input(" ").await.unwrap();

        let outcome = session.handle.submit(" ").await.unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome::Rejected(TransitionError::EmptyMessage)
        );
        let snap = session.handle.snapshot().await.unwrap();
        assert!(snap.messages.is_empty());
        assert!(!snap.pending);
        assert_eq!(snap.input, " ");
        assert!(service.recorded_utterances().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_submit_is_dropped() {
        let service = Arc::new(GatedAnsweringService::new());
        service.queue_reply("reply to a");
        service.queue_reply("reply to b");
        let mut session = TestSession::spawn(Arc::clone(&service));

        assert_eq!(
            session.handle.submit("a").await.unwrap(),
            SubmitOutcome::Accepted
        );
        service.request_started.notified().await;
        session.handle.set_input("b").await.unwrap();
        assert_eq!(
            session.handle.submit("b").await.unwrap(),
            SubmitOutcome::Rejected(TransitionError::ReplyPending)
        );

        service.release_one();
        let snap = session.wait_for_idle(WAIT).await.unwrap();
        assert_eq!(
            snap.messages,
            vec![Message::user("a"), Message::assistant("reply to a")]
        );
        assert_eq!(service.recorded_utterances(), vec!["a"]);

        let snap = session.handle.snapshot().await.unwrap();
        assert_eq!(snap.input, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_settles_as_failure() {
        let service = Arc::new(GatedAnsweringService::new());
        let mut session =
            TestSession::spawn_with_timeout(Arc::clone(&service), Some(Duration::from_millis(50)));

        session.handle.submit("stuck").await.unwrap();

        let snap = session.wait_for_idle(WAIT).await.expect("timeout never fired");
        assert_eq!(
            snap.messages,
            vec![Message::user("stuck"), Message::assistant(DEFAULT_ERROR_REPLY)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_answer_stays_pending_without_timeout() {
        let service = Arc::new(GatedAnsweringService::new());
        let session = TestSession::spawn(Arc::clone(&service));

        session.handle.submit("stuck").await.unwrap();
        tokio::time::sleep(Duration::from_secs(3600)).await;

        let snap = session.handle.snapshot().await.unwrap();
        assert!(snap.pending);
        assert_eq!(snap.messages, vec![Message::user("stuck")]);
    }

    #[tokio::test]
    async fn test_session_manager_lifecycle() {
        let service = MockAnsweringService::new();
        let manager = SessionManager::new(
            service,
            SessionSettings {
                error_reply: DEFAULT_ERROR_REPLY.to_string(),
                answer_timeout: None,
                attach_grace: Duration::from_secs(30),
            },
        );
        assert_eq!(manager.service_name(), "mock");

        let (first, handle) = manager.create().await;
        let (second, _) = manager.create().await;
        assert_ne!(first, second);
        assert_eq!(manager.count().await, 2);
        assert!(manager.get(&first).await.is_some());

        assert!(manager.close(&first).await);
        assert!(!manager.close(&first).await);
        assert!(manager.get(&first).await.is_none());
        assert_eq!(manager.count().await, 1);

        // The runtime is gone even though this clone survived
        assert_eq!(handle.snapshot().await, Err(SessionError::Closed));
    }

    #[tokio::test]
    async fn test_dropped_watch_discards_session() {
        let manager = SessionManager::new(
            MockAnsweringService::new(),
            SessionSettings {
                error_reply: DEFAULT_ERROR_REPLY.to_string(),
                answer_timeout: None,
                attach_grace: Duration::from_secs(30),
            },
        );
        let (id, handle) = manager.create().await;
        let (_, watch) = manager.watch(&id).await.unwrap();
        assert!(manager.watch("nope").await.is_none());

        drop(watch);
        for _ in 0..100 {
            if manager.count().await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(manager.count().await, 0);
        assert!(manager.get(&id).await.is_none());
        assert_eq!(handle.snapshot().await, Err(SessionError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watched_session_outlives_grace() {
        let manager = SessionManager::new(
            MockAnsweringService::new(),
            SessionSettings {
                error_reply: DEFAULT_ERROR_REPLY.to_string(),
                answer_timeout: None,
                attach_grace: Duration::from_millis(100),
            },
        );
        let (watched, handle) = manager.create().await;
        let (abandoned, _) = manager.create().await;
        let _events = handle.subscribe();

        tokio::time::sleep(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;

        assert!(manager.get(&watched).await.is_some());
        assert!(manager.get(&abandoned).await.is_none());
        assert_eq!(manager.count().await, 1);
    }

    #[tokio::test]
    async fn test_panicking_service_becomes_apology() {
        let mut session = TestSession::spawn(Arc::new(PanickingAnsweringService));

        session.handle.submit("What is labor law?").await.unwrap();

        let snap = session.wait_for_idle(WAIT).await.expect("panic never settled");
        assert_eq!(
            snap.messages,
            vec![
                Message::user("What is labor law?"),
                Message::assistant(DEFAULT_ERROR_REPLY),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_reported_once() {
        let records = Arc::new(Mutex::new(Vec::new()));
        let _guard = tracing_subscriber::registry()
            .with(LevelRecorder(Arc::clone(&records)))
            .set_default();

        let service = MockAnsweringService::new();
        service.queue_error(AnswerError::failed("connection refused"));
        let inner: Arc<dyn AnsweringService> = Arc::new(service);
        let mut session = TestSession::spawn(Arc::new(LoggingService::new(inner)));

        session.handle.submit("What is labor law?").await.unwrap();
        session.wait_for_idle(WAIT).await.expect("failure never settled");

        let loud: Vec<_> = records
            .lock()
            .unwrap()
            .iter()
            .filter(|(level, _)| *level == Level::ERROR || *level == Level::WARN)
            .cloned()
            .collect();
        assert_eq!(loud, vec![(Level::ERROR, "Error sending message".to_string())]);
    }

    /// Records level and message of every event
    struct LevelRecorder(Arc<Mutex<Vec<(Level, String)>>>);

    impl<S: tracing::Subscriber> Layer<S> for LevelRecorder {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            struct MessageVisitor(String);

            impl tracing::field::Visit for MessageVisitor {
                fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                    if field.name() == "message" {
                        self.0 = format!("{value:?}");
                    }
                }
            }

            let mut visitor = MessageVisitor(String::new());
            event.record(&mut visitor);
            self.0
                .lock()
                .unwrap()
                .push((*event.metadata().level(), visitor.0));
        }
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let service = MockAnsweringService::new();
        service.queue_reply("only for one");
        let manager = SessionManager::new(
            service,
            SessionSettings {
                error_reply: DEFAULT_ERROR_REPLY.to_string(),
                answer_timeout: None,
                attach_grace: Duration::from_secs(30),
            },
        );
        let (_, one) = manager.create().await;
        let (_, two) = manager.create().await;
        let mut one_events = one.subscribe();

        one.submit("question").await.unwrap();
        loop {
            let SessionEvent::Snapshot(snap) = one_events.recv().await.unwrap();
            if !snap.pending {
                break;
            }
        }

        assert_eq!(one.snapshot().await.unwrap().messages.len(), 2);
        assert!(two.snapshot().await.unwrap().messages.is_empty());
    }
}
