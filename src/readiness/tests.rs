//! Readiness Module Tests
//!
//! The controller is exercised through its collaborator seams (probe, start,
//! stop closures) with call counters, so the state machine runs without
//! Docker or a live backend. Intervals are shrunk to milliseconds.

#[cfg(test)]
mod tests {
    use crate::events::{EventBroadcaster, EventKind};
    use crate::readiness::controller::ReadinessController;
    use crate::readiness::types::{
        ProbeFn, ReadinessConfig, ReadinessState, StartFn, StartOutcome, StopFn,
    };
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_config() -> ReadinessConfig {
        ReadinessConfig {
            probe_interval: Duration::from_millis(1),
            startup_probes: 5,
            restart_probes: 3,
            restart_pause: Duration::from_millis(1),
            waiting_event_every: 2,
        }
    }

    type BoolFuture = Pin<Box<dyn Future<Output = bool> + Send>>;
    type StartFuture = Pin<Box<dyn Future<Output = anyhow::Result<StartOutcome>> + Send>>;
    type StopFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

    /// Probe that answers ready once at least `ready_after` calls happened.
    fn counting_probe(ready_after: usize, calls: Arc<AtomicUsize>) -> ProbeFn {
        Arc::new(move || {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                call >= ready_after
            }) as BoolFuture
        })
    }

    /// Probe that is never ready.
    fn never_ready_probe(calls: Arc<AtomicUsize>) -> ProbeFn {
        Arc::new(move || {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                false
            }) as BoolFuture
        })
    }

    fn counting_start(outcome: StartOutcome, calls: Arc<AtomicUsize>) -> StartFn {
        Arc::new(move || {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(outcome)
            }) as StartFuture
        })
    }

    fn failing_start() -> StartFn {
        Arc::new(|| {
            Box::pin(async { Err(anyhow::anyhow!("compose file missing")) }) as StartFuture
        })
    }

    fn counting_stop(calls: Arc<AtomicUsize>) -> StopFn {
        Arc::new(move || {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }) as StopFuture
        })
    }

    fn failing_stop() -> StopFn {
        Arc::new(|| Box::pin(async { Err(anyhow::anyhow!("no such stack")) }) as StopFuture)
    }

    fn event_kinds(broadcaster: &EventBroadcaster) -> Vec<String> {
        broadcaster
            .history(100)
            .iter()
            .map(|event| event.kind.wire_name())
            .collect()
    }

    // ============================================================
    // TEST 1: Already-answering backend skips the start action
    // ============================================================

    #[tokio::test]
    async fn test_ready_backend_skips_start() {
        let broadcaster = EventBroadcaster::new(100, 10);
        let probe_calls = Arc::new(AtomicUsize::new(0));
        let start_calls = Arc::new(AtomicUsize::new(0));

        let controller = ReadinessController::new(
            broadcaster.clone(),
            counting_probe(1, probe_calls.clone()),
            counting_start(StartOutcome::Started, start_calls.clone()),
            counting_stop(Arc::new(AtomicUsize::new(0))),
            test_config(),
        );

        let state = controller.ensure_ready().await.unwrap();

        assert_eq!(state, ReadinessState::Ready);
        assert!(controller.is_ready().await);
        assert_eq!(start_calls.load(Ordering::SeqCst), 0);
        assert_eq!(probe_calls.load(Ordering::SeqCst), 1);
        assert_eq!(event_kinds(&broadcaster), vec!["readiness_ready"]);
    }

    // ============================================================
    // TEST 2: Cold start reaches Ready on the first wait probe
    // ============================================================

    #[tokio::test]
    async fn test_cold_start_first_probe_success() {
        let broadcaster = EventBroadcaster::new(100, 10);
        let start_calls = Arc::new(AtomicUsize::new(0));

        // Call 1 is the pre-start check (not ready), call 2 is the first
        // wait-loop probe.
        let controller = ReadinessController::new(
            broadcaster.clone(),
            counting_probe(2, Arc::new(AtomicUsize::new(0))),
            counting_start(StartOutcome::Started, start_calls.clone()),
            counting_stop(Arc::new(AtomicUsize::new(0))),
            test_config(),
        );

        let state = controller.ensure_ready().await.unwrap();

        assert_eq!(state, ReadinessState::Ready);
        assert_eq!(start_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            event_kinds(&broadcaster),
            vec!["readiness_starting", "readiness_waiting", "readiness_ready"]
        );
    }

    // ============================================================
    // TEST 3: Exhausted probe budget is a terminal Failed, not an error
    // ============================================================

    #[tokio::test]
    async fn test_probe_budget_exhausted_fails() {
        let broadcaster = EventBroadcaster::new(100, 10);
        let probe_calls = Arc::new(AtomicUsize::new(0));

        let controller = ReadinessController::new(
            broadcaster.clone(),
            never_ready_probe(probe_calls.clone()),
            counting_start(StartOutcome::Started, Arc::new(AtomicUsize::new(0))),
            counting_stop(Arc::new(AtomicUsize::new(0))),
            test_config(),
        );

        let state = controller.ensure_ready().await.unwrap();

        assert_eq!(state, ReadinessState::Failed);
        assert_eq!(controller.state().await, ReadinessState::Failed);

        // Pre-start check plus the full wait budget, then nothing more.
        let after_run = probe_calls.load(Ordering::SeqCst);
        assert_eq!(after_run, 1 + test_config().startup_probes as usize);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(probe_calls.load(Ordering::SeqCst), after_run);

        let kinds = event_kinds(&broadcaster);
        assert_eq!(kinds.last().unwrap(), "readiness_failed");
        // Waiting heartbeats at the reduced cadence (every 2 of 5 probes),
        // on top of the transition event itself.
        let waiting = kinds.iter().filter(|k| *k == "readiness_waiting").count();
        assert_eq!(waiting, 3);
    }

    // ============================================================
    // TEST 4: Hard start failure propagates as fatal
    // ============================================================

    #[tokio::test]
    async fn test_start_failure_is_fatal() {
        let broadcaster = EventBroadcaster::new(100, 10);

        let controller = ReadinessController::new(
            broadcaster.clone(),
            never_ready_probe(Arc::new(AtomicUsize::new(0))),
            failing_start(),
            counting_stop(Arc::new(AtomicUsize::new(0))),
            test_config(),
        );

        let result = controller.ensure_ready().await;

        assert!(result.is_err());
        assert_eq!(controller.state().await, ReadinessState::Failed);
        assert_eq!(event_kinds(&broadcaster).last().unwrap(), "readiness_failed");
    }

    // ============================================================
    // TEST 5: "Already running" start conflict is benign
    // ============================================================

    #[tokio::test]
    async fn test_already_running_conflict_is_success() {
        let broadcaster = EventBroadcaster::new(100, 10);
        let start_calls = Arc::new(AtomicUsize::new(0));

        let controller = ReadinessController::new(
            broadcaster.clone(),
            counting_probe(2, Arc::new(AtomicUsize::new(0))),
            counting_start(StartOutcome::AlreadyRunning, start_calls.clone()),
            counting_stop(Arc::new(AtomicUsize::new(0))),
            test_config(),
        );

        let state = controller.ensure_ready().await.unwrap();

        assert_eq!(state, ReadinessState::Ready);
        assert_eq!(start_calls.load(Ordering::SeqCst), 1);
    }

    // ============================================================
    // TEST 6: Restart reports a timeout as an outcome
    // ============================================================

    #[tokio::test]
    async fn test_restart_timeout_is_reported_not_raised() {
        let broadcaster = EventBroadcaster::new(100, 10);
        let stop_calls = Arc::new(AtomicUsize::new(0));

        let controller = ReadinessController::new(
            broadcaster.clone(),
            never_ready_probe(Arc::new(AtomicUsize::new(0))),
            counting_start(StartOutcome::Started, Arc::new(AtomicUsize::new(0))),
            counting_stop(stop_calls.clone()),
            test_config(),
        );

        let ready = controller.restart().await.unwrap();

        assert!(!ready);
        assert_eq!(stop_calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state().await, ReadinessState::Failed);
    }

    #[tokio::test]
    async fn test_restart_reaches_ready() {
        let broadcaster = EventBroadcaster::new(100, 10);

        let controller = ReadinessController::new(
            broadcaster.clone(),
            counting_probe(1, Arc::new(AtomicUsize::new(0))),
            counting_start(StartOutcome::Started, Arc::new(AtomicUsize::new(0))),
            counting_stop(Arc::new(AtomicUsize::new(0))),
            test_config(),
        );

        let ready = controller.restart().await.unwrap();

        assert!(ready);
        assert_eq!(controller.state().await, ReadinessState::Ready);

        let kinds = event_kinds(&broadcaster);
        assert!(kinds.contains(&"container_restarting".to_string()));
        assert!(kinds.contains(&"container_stopped".to_string()));
        assert_eq!(kinds.last().unwrap(), "readiness_ready");
    }

    // ============================================================
    // TEST 7: Stop is best-effort and always lands in Stopped
    // ============================================================

    #[tokio::test]
    async fn test_stop_swallows_stop_action_failure() {
        let broadcaster = EventBroadcaster::new(100, 10);

        let controller = ReadinessController::new(
            broadcaster.clone(),
            counting_probe(1, Arc::new(AtomicUsize::new(0))),
            counting_start(StartOutcome::Started, Arc::new(AtomicUsize::new(0))),
            failing_stop(),
            test_config(),
        );

        controller.ensure_ready().await.unwrap();
        assert!(controller.is_ready().await);

        controller.stop().await;

        assert_eq!(controller.state().await, ReadinessState::Stopped);
        assert!(!controller.is_ready().await);
        assert_eq!(event_kinds(&broadcaster).last().unwrap(), "container_stopped");
    }

    // ============================================================
    // TEST 8: Waiting heartbeat payload carries probe progress
    // ============================================================

    #[tokio::test]
    async fn test_waiting_heartbeat_payload() {
        let broadcaster = EventBroadcaster::new(100, 10);

        let controller = ReadinessController::new(
            broadcaster.clone(),
            counting_probe(4, Arc::new(AtomicUsize::new(0))),
            counting_start(StartOutcome::Started, Arc::new(AtomicUsize::new(0))),
            counting_stop(Arc::new(AtomicUsize::new(0))),
            test_config(),
        );

        controller.ensure_ready().await.unwrap();

        let heartbeat = broadcaster
            .history(100)
            .into_iter()
            .find(|event| {
                event.kind == EventKind::ReadinessWaiting && event.data.get("probes").is_some()
            })
            .expect("expected a waiting heartbeat");
        assert_eq!(heartbeat.data["probes"], 2);
    }
}
