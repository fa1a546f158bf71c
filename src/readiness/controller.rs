//! Readiness Controller
//!
//! Owns the readiness state machine and the polling loop that drives it.
//! Transitions publish lifecycle events through the broadcaster; health and
//! status queries read a snapshot and never mutate. Overlapping runs (a
//! restart issued while startup is still polling) are serialized by a run
//! guard so the machine advances from exactly one place at a time.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::events::{EventBroadcaster, EventKind};

use super::types::{ProbeFn, ReadinessConfig, ReadinessState, StartFn, StartOutcome, StopFn};

pub struct ReadinessController {
    state: RwLock<ReadinessState>,
    broadcaster: Arc<EventBroadcaster>,
    probe: ProbeFn,
    start: StartFn,
    stop: StopFn,
    config: ReadinessConfig,
    run_guard: Mutex<()>,
}

impl ReadinessController {
    pub fn new(
        broadcaster: Arc<EventBroadcaster>,
        probe: ProbeFn,
        start: StartFn,
        stop: StopFn,
        config: ReadinessConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(ReadinessState::Stopped),
            broadcaster,
            probe,
            start,
            stop,
            config,
            run_guard: Mutex::new(()),
        })
    }

    /// Current state snapshot.
    pub async fn state(&self) -> ReadinessState {
        *self.state.read().await
    }

    /// Whether dependent traffic may flow right now.
    pub async fn is_ready(&self) -> bool {
        self.state().await == ReadinessState::Ready
    }

    /// Brings the backend to `Ready`, issuing the start action only if the
    /// backend is not already answering its probe.
    ///
    /// Returns the terminal state reached: `Ready`, or `Failed` when the
    /// probe budget ran out. The only `Err` is a start action that failed for
    /// a reason other than the benign already-running conflict.
    pub async fn ensure_ready(&self) -> Result<ReadinessState> {
        let _guard = self.run_guard.lock().await;

        if (self.probe)().await {
            tracing::info!("Backend already answering, skipping start action");
            self.transition(
                ReadinessState::Ready,
                serde_json::json!({"already_running": true}),
            )
            .await;
            return Ok(ReadinessState::Ready);
        }

        self.run_start().await?;
        self.wait_for_backend(self.config.startup_probes).await
    }

    /// Stops the backend. Best-effort: stop-action failures are logged and
    /// swallowed, the state still becomes `Stopped`.
    pub async fn stop(&self) {
        let _guard = self.run_guard.lock().await;
        self.stop_inner().await;
    }

    /// Stop, pause, start, then wait for readiness within the restart budget.
    ///
    /// Returns whether readiness was achieved. A probe budget that runs out is
    /// a reported outcome (`Ok(false)`), not an error; only a failed start
    /// action is.
    pub async fn restart(&self) -> Result<bool> {
        let _guard = self.run_guard.lock().await;

        tracing::info!("Restarting backend containers");
        self.broadcaster
            .emit_container_event("restarting", serde_json::json!({}));

        self.stop_inner().await;
        tokio::time::sleep(self.config.restart_pause).await;

        self.run_start().await?;
        let state = self.wait_for_backend(self.config.restart_probes).await?;
        Ok(state == ReadinessState::Ready)
    }

    async fn run_start(&self) -> Result<()> {
        self.transition(ReadinessState::Starting, serde_json::json!({}))
            .await;

        match (self.start)().await {
            Ok(StartOutcome::Started) => {
                tracing::info!("Start action issued");
                Ok(())
            }
            Ok(StartOutcome::AlreadyRunning) => {
                tracing::info!("Backend containers already running");
                Ok(())
            }
            Err(err) => {
                self.transition(
                    ReadinessState::Failed,
                    serde_json::json!({"reason": err.to_string()}),
                )
                .await;
                Err(err)
            }
        }
    }

    /// Polls the probe until it answers or the budget runs out.
    async fn wait_for_backend(&self, budget: u32) -> Result<ReadinessState> {
        self.transition(
            ReadinessState::WaitingForBackend,
            serde_json::json!({"budget_probes": budget}),
        )
        .await;

        for attempt in 1..=budget {
            if (self.probe)().await {
                self.transition(
                    ReadinessState::Ready,
                    serde_json::json!({"probes": attempt}),
                )
                .await;
                return Ok(ReadinessState::Ready);
            }

            // Heartbeat at a reduced cadence; one event per poll would flood
            // the feed for minutes during model loading.
            if attempt % self.config.waiting_event_every.max(1) == 0 {
                tracing::info!("Still waiting for backend ({} probes)", attempt);
                self.broadcaster.publish(
                    EventKind::ReadinessWaiting,
                    serde_json::json!({"probes": attempt}),
                );
            }

            tokio::time::sleep(self.config.probe_interval).await;
        }

        tracing::error!("Backend not ready after {} probes", budget);
        self.transition(
            ReadinessState::Failed,
            serde_json::json!({"reason": "probe budget exhausted", "probes": budget}),
        )
        .await;
        Ok(ReadinessState::Failed)
    }

    async fn stop_inner(&self) {
        if let Err(err) = (self.stop)().await {
            tracing::warn!("Stop action failed (ignored): {}", err);
        }

        *self.state.write().await = ReadinessState::Stopped;
        tracing::info!("Backend stopped");
        self.broadcaster
            .emit_container_event("stopped", serde_json::json!({}));
    }

    /// Applies a transition and publishes its lifecycle event.
    async fn transition(&self, next: ReadinessState, detail: serde_json::Value) {
        *self.state.write().await = next;
        tracing::debug!("Readiness state -> {:?}", next);

        let kind = match next {
            ReadinessState::Starting => EventKind::ReadinessStarting,
            ReadinessState::WaitingForBackend => EventKind::ReadinessWaiting,
            ReadinessState::Ready => EventKind::ReadinessReady,
            ReadinessState::Failed => EventKind::ReadinessFailed,
            // Stop publishes a container event instead.
            ReadinessState::Stopped => return,
        };

        self.broadcaster.publish(kind, detail);
    }
}
