//! Service Readiness Module
//!
//! Drives the backing GROBID service from "not running" to "ready" before
//! dependent traffic is accepted, and keeps answering truthfully about where
//! in that journey the service currently is.
//!
//! ## Core Mechanisms
//! - **State machine**: `Stopped -> Starting -> WaitingForBackend ->
//!   Ready|Failed`, with an explicit stop from any state. Readers only ever
//!   see snapshots; the controller owns all mutation.
//! - **Bounded polling**: the liveness probe runs on a fixed interval with a
//!   hard budget; exceeding the budget is a reported terminal state, not an
//!   error.
//! - **Observable progress**: every transition publishes a lifecycle event
//!   through the broadcaster, with waiting heartbeats at a reduced cadence so
//!   the feed is not flooded by the poll loop.

pub mod controller;
pub mod handlers;
pub mod probe;
pub mod types;

pub use controller::ReadinessController;
pub use probe::BackendProbe;
pub use types::{ProbeFn, ReadinessConfig, ReadinessState, StartFn, StartOutcome, StopFn};

#[cfg(test)]
mod tests;
