//! Conversation runtime executor

use super::{SessionCommand, SessionEvent, SubmitOutcome};

use crate::answer::{AnswerError, AnsweringService};
use crate::state_machine::{ConvContext, Conversation, Effect, Event, TransitionError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Owns one conversation and serializes every change to it
///
/// Commands from handles and answer settlements are processed one at a time,
/// so the conversation is only ever touched from this task.
pub struct ConversationRuntime<A>
where
    A: AnsweringService + 'static,
{
    context: ConvContext,
    conversation: Conversation,
    service: Arc<A>,
    answer_timeout: Option<Duration>,
    command_rx: mpsc::Receiver<SessionCommand>,
    /// Settlements posted back by answer tasks
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
}

impl<A> ConversationRuntime<A>
where
    A: AnsweringService + 'static,
{
    pub fn new(
        context: ConvContext,
        service: Arc<A>,
        command_rx: mpsc::Receiver<SessionCommand>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(8);
        Self {
            context,
            conversation: Conversation::new(),
            service,
            answer_timeout: None,
            command_rx,
            event_rx,
            event_tx,
            broadcast_tx,
        }
    }

    /// Settle requests that take longer than `timeout` as failures
    pub fn with_answer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.answer_timeout = timeout;
        self
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting conversation runtime");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(SessionCommand::Close) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(event) = self.event_rx.recv() => {
                    if let Err(e) = self.process_event(event) {
                        tracing::warn!(
                            session_id = %self.context.session_id,
                            error = %e,
                            "Discarding answer settlement"
                        );
                    }
                }
            }
        }

        if self.conversation.is_pending() {
            tracing::debug!(
                session_id = %self.context.session_id,
                "Dropping in-flight answer for closed session"
            );
        }
        tracing::info!(
            session_id = %self.context.session_id,
            messages = self.conversation.messages().len(),
            "Conversation runtime stopped"
        );
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Submit { text, reply } => {
                let outcome = match self.process_event(Event::submit(text)) {
                    Ok(()) => SubmitOutcome::Accepted,
                    Err(e) => {
                        tracing::debug!(
                            session_id = %self.context.session_id,
                            reason = %e,
                            "Submission ignored"
                        );
                        SubmitOutcome::Rejected(e)
                    }
                };
                // The caller may have gone away; the submission stands either way
                let _ = reply.send(outcome);
            }
            SessionCommand::SetInput { text } => self.conversation.set_input(text),
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.conversation.snapshot());
            }
            SessionCommand::Close => {}
        }
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        let effects = self.conversation.handle(&self.context, event)?;
        tracing::debug!(
            session_id = %self.context.session_id,
            state = self.conversation.state().name(),
            "Conversation transitioned"
        );

        for effect in effects {
            self.execute_effect(effect);
        }
        Ok(())
    }

    fn execute_effect(&self, effect: Effect) {
        match effect {
            Effect::RequestAnswer { utterance } => self.spawn_answer(utterance),

            Effect::ReportFailure { utterance, error } => {
                tracing::error!(
                    session_id = %self.context.session_id,
                    kind = error.kind.as_str(),
                    error = %error.message,
                    utterance_chars = utterance.chars().count(),
                    "Error sending message"
                );
            }

            Effect::NotifyClient => {
                // No subscribers is fine
                let _ = self
                    .broadcast_tx
                    .send(SessionEvent::Snapshot(self.conversation.snapshot()));
            }

            // Applied by Conversation::handle
            Effect::AppendMessage(_) | Effect::ClearInput => {}
        }
    }

    /// Ask the service in a background task; the outcome comes back as an event
    fn spawn_answer(&self, utterance: String) {
        let service = Arc::clone(&self.service);
        let event_tx = self.event_tx.clone();
        let timeout = self.answer_timeout;

        tokio::spawn(async move {
            let call = tokio::spawn(async move {
                answer_within(service.as_ref(), &utterance, timeout).await
            });
            // A panicking service still has to settle the request
            let outcome = call.await.unwrap_or_else(|e| {
                Err(AnswerError::failed(format!("Answering service aborted: {e}")))
            });
            // Runtime gone means the session was closed
            let _ = event_tx.send(Event::settled(outcome)).await;
        });
    }
}

async fn answer_within<A: AnsweringService + ?Sized>(
    service: &A,
    utterance: &str,
    timeout: Option<Duration>,
) -> Result<String, AnswerError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, service.answer(utterance))
            .await
            .unwrap_or_else(|_| Err(AnswerError::timeout(limit))),
        None => service.answer(utterance).await,
    }
}
