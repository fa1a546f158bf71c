use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::VecDeque;
use std::sync::Arc;

/// Maximum length of an error message embedded in an event payload.
pub const MAX_ERROR_LEN: usize = 200;

/// The enumerated tag of an operational event.
///
/// Serializes as the wire tag string (`extraction_start`, `container_stopped`,
/// `readiness_ready`, ...). Container events carry a free-form sub-event name
/// because the container runtime reports open-ended transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    ExtractionStart,
    ExtractionSuccess,
    ExtractionFailure,
    Container(String),
    ReadinessStarting,
    ReadinessWaiting,
    ReadinessReady,
    ReadinessFailed,
}

impl EventKind {
    /// The tag string used on the wire and in SSE event names.
    pub fn wire_name(&self) -> String {
        match self {
            EventKind::ExtractionStart => "extraction_start".to_string(),
            EventKind::ExtractionSuccess => "extraction_success".to_string(),
            EventKind::ExtractionFailure => "extraction_failure".to_string(),
            EventKind::Container(sub) => format!("container_{}", sub),
            EventKind::ReadinessStarting => "readiness_starting".to_string(),
            EventKind::ReadinessWaiting => "readiness_waiting".to_string(),
            EventKind::ReadinessReady => "readiness_ready".to_string(),
            EventKind::ReadinessFailed => "readiness_failed".to_string(),
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.wire_name())
    }
}

/// An immutable record of something that happened.
///
/// Once published an event is never mutated; subscribers share it behind an
/// `Arc`. The wire shape is `{type, data, timestamp}`.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// The enumerated event tag.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Kind-specific payload: a mapping of string keys to scalar values
    /// (filename, endpoint, latency, ...).
    pub data: serde_json::Value,
    /// Capture time at publish.
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(kind: EventKind, data: serde_json::Value) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Opaque handle identifying a registered subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub String);

impl SubscriberId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-capacity ring of the most recent events, oldest evicted first.
///
/// Pure data structure: the broadcaster owns it and provides the locking.
/// Also tracks the total number of events ever recorded, which keeps counting
/// past evictions.
#[derive(Debug)]
pub struct HistoryBuffer {
    entries: VecDeque<Arc<Event>>,
    capacity: usize,
    recorded: u64,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            recorded: 0,
        }
    }

    /// Appends an event, evicting the oldest entry when at capacity.
    pub fn push(&mut self, event: Arc<Event>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
        self.recorded += 1;
    }

    /// Up to `limit` most recent events, oldest-first within the window.
    pub fn recent(&self, limit: usize) -> Vec<Arc<Event>> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Number of events currently retained.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of events ever recorded, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.recorded
    }
}

/// Truncates error text to the payload limit, respecting char boundaries.
pub fn truncate_error(error: &str) -> String {
    error.chars().take(MAX_ERROR_LEN).collect()
}
