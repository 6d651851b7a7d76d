use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use bytes::Bytes;
use futures::stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

use crate::config::SSE_KEEPALIVE_SECS;
use crate::state::{AppState, PreSerializedEvent, shutdown_requested};

/// Live view stream: the current snapshot first, then every published event.
/// Ends when the server begins shutting down.
pub async fn view_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before reading the snapshot so nothing published in between is lost.
    let rx = state.event_tx.subscribe();
    let shutdown = shutdown_requested(state.shutdown_signal());

    let stream = async_stream::stream! {
        tokio::pin!(shutdown);
        let (mut last_seq, data) = current_snapshot(&state).await;
        if let Some(event) = sse_event("snapshot", last_seq, &data) {
            yield Ok(event);
        }

        let mut stream = BroadcastStream::new(rx);
        loop {
            let result = tokio::select! {
                () = &mut shutdown => break,
                next = stream.next() => match next {
                    Some(result) => result,
                    None => break,
                },
            };
            match result {
                Ok(event) => {
                    let (event_type, seq, data) = match event {
                        PreSerializedEvent::Snapshot { seq, json } => ("snapshot", seq, json),
                        PreSerializedEvent::Update { seq, json } => ("update", seq, json),
                    };
                    // Already covered by the snapshot sent on connect.
                    if seq <= last_seq {
                        continue;
                    }
                    last_seq = seq;
                    if let Some(event) = sse_event(event_type, seq, &data) {
                        yield Ok(event);
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(
                        skipped_events = skipped,
                        "SSE client lagged behind broadcast buffer; replaying snapshot"
                    );
                    let (seq, data) = current_snapshot(&state).await;
                    last_seq = seq;
                    if let Some(event) = sse_event("snapshot", seq, &data) {
                        yield Ok(event);
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEPALIVE_SECS))
            .text("keep-alive"),
    )
}

async fn current_snapshot(state: &AppState) -> (u64, Arc<Bytes>) {
    let live = state.live_view.read().await;
    (live.seq, Arc::clone(&live.snapshot_json))
}

fn sse_event(event_type: &'static str, seq: u64, data: &Bytes) -> Option<Event> {
    if data.is_empty() {
        return None;
    }
    let Ok(payload) = std::str::from_utf8(data.as_ref()) else {
        warn!(seq, event = event_type, "event payload is not valid utf-8; dropping SSE event");
        return None;
    };
    Some(
        Event::default()
            .id(seq.to_string())
            .event(event_type)
            .data(payload),
    )
}
