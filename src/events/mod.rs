//! Real-Time Event Broadcast Module
//!
//! Implements the fan-out point for all operational events: extraction
//! lifecycle, container transitions, and readiness progress. Any number of
//! SSE clients can observe the feed; none of them can stall the publisher.
//!
//! ## Core Mechanisms
//! - **Bounded mailboxes**: every subscriber owns a fixed-capacity queue that
//!   is filled without blocking. A subscriber whose mailbox is full is evicted
//!   during the publish that found it full (drop the slow subscriber, not the
//!   event).
//! - **History replay**: the most recent events are retained in a fixed-size
//!   ring so a newly connected client can catch up on what it missed.
//! - **Single critical section**: the subscriber registry and the history ring
//!   mutate together under one lock, so no call observes a partially applied
//!   publish or subscribe.

pub mod broadcaster;
pub mod handlers;
pub mod types;

pub use broadcaster::{EventBroadcaster, Subscription};
pub use types::{Event, EventKind, HistoryBuffer, SubscriberId};
