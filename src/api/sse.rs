//! Server-Sent Events support

use crate::runtime::{SessionEvent, SessionWatch};
use crate::state_machine::ConversationSnapshot;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream
///
/// The stream owns `watch`, so the session is discarded when the client
/// disconnects.
pub fn sse_stream(
    init: ConversationSnapshot,
    broadcast_rx: tokio::sync::broadcast::Receiver<SessionEvent>,
    watch: SessionWatch,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Start with the current state, then follow changes
    let init = futures::stream::once(async move { Ok(snapshot_event("init", &init)) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(move |result| {
        let _watch = &watch;
        match result {
            Ok(SessionEvent::Snapshot(snapshot)) => {
                Some(Ok(snapshot_event("snapshot", &snapshot)))
            }
            Err(_) => None, // Skip lagged messages; the next snapshot is complete anyway
        }
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn snapshot_event(event_type: &str, snapshot: &ConversationSnapshot) -> Event {
    let data = serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(event_type).data(data)
}
