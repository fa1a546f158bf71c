use super::broadcaster::{EventBroadcaster, DEFAULT_HISTORY_LIMIT};
use super::types::Event;

use axum::extract::Query;
use axum::response::sse::{Event as SseEvent, Sse};
use axum::{Extension, Json};
use chrono::Utc;
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Silence threshold after which a keep-alive record is sent, so that idle
/// connections are not reaped by proxies in between.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    /// Most recent events, oldest-first within the window.
    pub events: Vec<Arc<Event>>,
    /// Total number of events recorded since startup, not just returned.
    pub total_recorded: u64,
}

/// `GET /events/stream` — live SSE feed with history-independent delivery.
///
/// Session protocol: a `connected` record first (carrying the current
/// subscriber count), then every published event in publish order, with a
/// `ping` record whenever the feed has been silent for the keep-alive
/// interval. `connected` and `ping` are transport records and never enter
/// history. The subscription is released on every exit path: client
/// disconnect drops the stream, which drops the mailbox registration.
pub async fn handle_event_stream(
    Extension(broadcaster): Extension<Arc<EventBroadcaster>>,
) -> Sse<impl Stream<Item = Result<SseEvent, axum::Error>>> {
    let subscription = broadcaster.subscribe();

    let connected = SseEvent::default().event("connected").json_data(
        serde_json::json!({
            "subscribers": broadcaster.subscriber_count(),
            "timestamp": Utc::now(),
        }),
    );

    let live = stream::unfold(subscription, |mut subscription| async move {
        match tokio::time::timeout(KEEP_ALIVE_INTERVAL, subscription.recv()).await {
            Ok(Some(event)) => {
                let record = SseEvent::default()
                    .event(event.kind.wire_name())
                    .json_data(event.as_ref());
                Some((record, subscription))
            }
            // Mailbox closed: this subscriber was evicted. End the stream so
            // the client reconnects and replays from history.
            Ok(None) => None,
            Err(_) => {
                let ping = SseEvent::default()
                    .event("ping")
                    .json_data(serde_json::json!({"timestamp": Utc::now()}));
                Some((ping, subscription))
            }
        }
    });

    Sse::new(stream::once(future::ready(connected)).chain(live))
}

/// `GET /events/history?limit=N` — replay window over the ring buffer.
pub async fn handle_event_history(
    Extension(broadcaster): Extension<Arc<EventBroadcaster>>,
    Query(params): Query<HistoryParams>,
) -> Json<HistoryResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    Json(HistoryResponse {
        events: broadcaster.history(limit),
        total_recorded: broadcaster.total_recorded(),
    })
}
