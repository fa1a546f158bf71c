use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle state of the backing service, as tracked by the controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    /// Not running, or explicitly stopped. The controller must be re-run from
    /// here to reach `Ready` again.
    Stopped,
    /// The start action has been issued and has not yet returned.
    Starting,
    /// The start action succeeded; polling the liveness probe.
    WaitingForBackend,
    /// The probe answered; dependent traffic may flow.
    Ready,
    /// The start action failed, or the probe budget ran out.
    Failed,
}

/// Result of the external start action.
///
/// A conflict because the service is already running is a benign outcome and
/// treated as success, not failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Async probe seam: returns whether the backend currently answers.
/// Any internal failure must resolve to `false`, never panic or propagate.
pub type ProbeFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = bool> + Send>> + Send + Sync>;

/// Async start-action seam.
pub type StartFn =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<StartOutcome>> + Send>> + Send + Sync>;

/// Async stop-action seam. Failures are absorbed by the controller.
pub type StopFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// Polling intervals and budgets for the readiness state machine.
///
/// Defaults match the production service (model loading can take minutes);
/// tests shrink them to keep the machine observable in milliseconds.
#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    /// Delay between liveness probes.
    pub probe_interval: Duration,
    /// Probe budget for the initial startup wait.
    pub startup_probes: u32,
    /// Probe budget for the (shorter) restart wait.
    pub restart_probes: u32,
    /// Pause between stop and start during a restart.
    pub restart_pause: Duration,
    /// Emit a `readiness_waiting` heartbeat every this many probes.
    pub waiting_event_every: u32,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(1),
            startup_probes: 180,
            restart_probes: 120,
            restart_pause: Duration::from_secs(2),
            waiting_event_every: 30,
        }
    }
}
