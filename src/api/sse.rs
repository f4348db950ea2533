//! Server-Sent Events support

use super::types::StateResponse;
use crate::runtime::SessionEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream
pub fn sse_stream(
    init: StateResponse,
    broadcast_rx: tokio::sync::broadcast::Receiver<SessionEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Create stream that starts with init event then broadcasts
    let init_event = Event::default()
        .event("init")
        .data(json!({ "type": "init", "session": init }).to_string());
    let init = futures::stream::once(async move { Ok(init_event) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(session_event_to_axum(event))),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn session_event_to_axum(event: SessionEvent) -> Event {
    let (event_type, data) = match event {
        SessionEvent::StateChange { state } => (
            "state_change",
            json!({
                "type": "state_change",
                "state": state
            }),
        ),
        SessionEvent::Notice(notice) => {
            return Event::default()
                .event("notice")
                .id(uuid::Uuid::new_v4().to_string())
                .data(
                    json!({
                        "type": "notice",
                        "level": notice.level,
                        "message": notice.message
                    })
                    .to_string(),
                );
        }
        SessionEvent::Snapshot(snapshot) => (
            "snapshot",
            json!({
                "type": "snapshot",
                "snapshot": snapshot
            }),
        ),
        SessionEvent::History(entries) => (
            "history",
            json!({
                "type": "history",
                "entries": entries
            }),
        ),
        SessionEvent::Error { message } => (
            "error",
            json!({
                "type": "error",
                "message": message
            }),
        ),
    };

    Event::default().event(event_type).data(data.to_string())
}
