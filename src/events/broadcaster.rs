//! Event Broadcaster
//!
//! The single authoritative fan-out point for operational events. Publish is
//! non-blocking regardless of subscriber state: each subscriber has a bounded
//! mailbox filled with `try_send`, and a subscriber whose mailbox is full is
//! removed from the active set as part of the same publish call. Publishers
//! favor the history ring and the live majority over one stalled observer.
//!
//! The subscriber registry and the history ring mutate together under one
//! mutex, so concurrent `publish`, `subscribe`, and `unsubscribe` calls never
//! observe an inconsistent intermediate state. The critical section is
//! O(subscribers) and never held across an await point.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::types::{truncate_error, Event, EventKind, HistoryBuffer, SubscriberId};

/// Default number of events returned by a history query.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

struct Inner {
    history: HistoryBuffer,
    subscribers: HashMap<SubscriberId, mpsc::Sender<Arc<Event>>>,
}

/// Fan-out point owning the replay history and the live subscriber registry.
///
/// One instance is constructed at process start and shared by reference with
/// every producer (readiness controller, proxy handlers) and consumer (SSE
/// sessions). Fresh instances per test keep it testable in isolation.
pub struct EventBroadcaster {
    inner: Mutex<Inner>,
    max_queue: usize,
}

impl EventBroadcaster {
    /// Creates a broadcaster retaining `max_history` events, with
    /// `max_queue`-deep subscriber mailboxes.
    pub fn new(max_history: usize, max_queue: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                history: HistoryBuffer::new(max_history),
                subscribers: HashMap::new(),
            }),
            max_queue: max_queue.max(1),
        })
    }

    /// Publishes an event to history and to every active subscriber.
    ///
    /// Never waits on a subscriber. Any mailbox that is full or closed causes
    /// its subscriber to be evicted from the active set before this call
    /// returns; the event itself is always recorded.
    pub fn publish(&self, kind: EventKind, data: serde_json::Value) -> Arc<Event> {
        let event = Arc::new(Event::new(kind, data));

        let mut inner = self.inner.lock();
        inner.history.push(event.clone());

        let mut evicted: Vec<SubscriberId> = Vec::new();
        for (id, tx) in inner.subscribers.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                    evicted.push(id.clone());
                }
            }
        }

        for id in evicted {
            inner.subscribers.remove(&id);
            tracing::warn!("Evicted slow subscriber {}", id.0);
        }

        event
    }

    /// Registers a new subscriber and returns its mailbox handle.
    ///
    /// Registration is atomic with respect to concurrent publishes: the new
    /// subscriber sees every event published after this call returns and none
    /// from before. Dropping the returned [`Subscription`] unsubscribes.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::channel(self.max_queue);
        let id = SubscriberId::new();

        self.inner.lock().subscribers.insert(id.clone(), tx);
        tracing::debug!("Subscriber {} registered", id.0);

        Subscription {
            id,
            rx,
            broadcaster: Arc::clone(self),
        }
    }

    /// Removes a subscriber from the active set.
    ///
    /// Idempotent: removing an unknown or already-removed handle is a no-op.
    pub fn unsubscribe(&self, id: &SubscriberId) {
        if self.inner.lock().subscribers.remove(id).is_some() {
            tracing::debug!("Subscriber {} removed", id.0);
        }
    }

    /// Up to `limit` most recent events, oldest-first. Pure read.
    pub fn history(&self, limit: usize) -> Vec<Arc<Event>> {
        self.inner.lock().history.recent(limit)
    }

    /// Total number of events ever published, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.inner.lock().history.total_recorded()
    }

    /// Number of currently active subscribers. Diagnostic only.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

/// Typed emit helpers consumed by the proxy layer and the readiness
/// controller. Payload shapes follow the wire contract of the feed.
impl EventBroadcaster {
    /// Emitted when an extraction request starts forwarding.
    pub fn emit_extraction_start(&self, filename: &str, endpoint: &str, file_size_kb: u64) {
        self.publish(
            EventKind::ExtractionStart,
            serde_json::json!({
                "filename": filename,
                "endpoint": endpoint,
                "file_size_kb": file_size_kb,
            }),
        );
    }

    /// Emitted after the backend answered an extraction request.
    pub fn emit_extraction_success(
        &self,
        filename: &str,
        endpoint: &str,
        latency_ms: f64,
        response_size_kb: u64,
        status_code: u16,
    ) {
        self.publish(
            EventKind::ExtractionSuccess,
            serde_json::json!({
                "filename": filename,
                "endpoint": endpoint,
                "latency_ms": round1(latency_ms),
                "response_size_kb": response_size_kb,
                "status_code": status_code,
            }),
        );
    }

    /// Emitted when forwarding an extraction request failed outright.
    /// The error text is truncated to bound payload memory.
    pub fn emit_extraction_failure(
        &self,
        filename: &str,
        endpoint: &str,
        error: &str,
        latency_ms: f64,
    ) {
        self.publish(
            EventKind::ExtractionFailure,
            serde_json::json!({
                "filename": filename,
                "endpoint": endpoint,
                "error": truncate_error(error),
                "latency_ms": round1(latency_ms),
            }),
        );
    }

    /// Emitted for container lifecycle transitions (`container_<sub>`).
    pub fn emit_container_event(&self, sub_event: &str, details: serde_json::Value) {
        self.publish(EventKind::Container(sub_event.to_string()), details);
    }
}

/// A live registration: the subscriber's mailbox plus its handle.
///
/// Release is unconditional on every exit path of the owning task: dropping
/// the subscription (normal completion, error, or cancellation of the SSE
/// session) removes it from the active set.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Arc<Event>>,
    broadcaster: Arc<EventBroadcaster>,
}

impl Subscription {
    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    /// Waits for the next queued event.
    ///
    /// Returns `None` once the broadcaster has evicted this subscriber and the
    /// mailbox drained: the feed is over and the client must reconnect.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(&self.id);
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
