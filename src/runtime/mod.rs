//! Container Runtime Module
//!
//! Wraps `docker compose` process management for the backing service:
//! start/stop actions consumed by the readiness controller, plus log and
//! status retrieval for the operator endpoints.
//!
//! Start is idempotent at this boundary: an "already running" conflict from
//! the container engine is reported as a benign outcome, not a failure.

pub mod compose;
pub mod handlers;

pub use compose::{ContainerRuntime, ContainerStatus};
