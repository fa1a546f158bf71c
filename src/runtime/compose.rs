use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Output;
use std::sync::Arc;
use tokio::process::Command;

use crate::readiness::types::{StartFn, StartOutcome, StopFn};

/// Health summary for one container of the backing stack.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerStatus {
    pub name: String,
    pub state: String,
    pub healthy: bool,
}

/// One line of `docker compose ps --format json` output.
#[derive(Debug, Deserialize)]
struct ComposePsEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "State")]
    state: String,
}

/// Process manager for the backing service's docker-compose stack.
pub struct ContainerRuntime {
    compose_file: PathBuf,
}

impl ContainerRuntime {
    pub fn new(compose_file: PathBuf) -> Arc<Self> {
        Arc::new(Self { compose_file })
    }

    async fn compose(&self, args: &[&str]) -> Result<Output> {
        Command::new("docker")
            .arg("compose")
            .arg("-f")
            .arg(&self.compose_file)
            .args(args)
            .output()
            .await
            .context("failed to invoke docker compose")
    }

    /// Brings the stack up in detached mode.
    ///
    /// A conflict because the containers already exist or run is a benign
    /// outcome; any other non-zero exit is fatal for the caller.
    pub async fn start(&self) -> Result<StartOutcome> {
        tracing::info!("Starting backend containers via {:?}", self.compose_file);
        let output = self.compose(&["up", "-d"]).await?;

        if output.status.success() {
            return Ok(StartOutcome::Started);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("already in use") || stderr.contains("is already running") {
            return Ok(StartOutcome::AlreadyRunning);
        }

        anyhow::bail!("docker compose up failed: {}", stderr.trim())
    }

    /// Tears the stack down.
    pub async fn stop(&self) -> Result<()> {
        tracing::info!("Stopping backend containers");
        let output = self.compose(&["down"]).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("docker compose down failed: {}", stderr.trim());
        }

        Ok(())
    }

    /// Last `tail` log lines of the stack.
    pub async fn logs(&self, tail: usize) -> Result<String> {
        let output = self
            .compose(&["logs", "--no-color", "--tail", &tail.to_string()])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("docker compose logs failed: {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Per-container status listing.
    ///
    /// `docker compose ps --format json` emits one JSON object per line;
    /// unparseable lines are skipped rather than failing the whole listing.
    pub async fn ps(&self) -> Result<Vec<ContainerStatus>> {
        let output = self.compose(&["ps", "--format", "json"]).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("docker compose ps failed: {}", stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let containers = stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str::<ComposePsEntry>(line).ok())
            .map(|entry| ContainerStatus {
                healthy: entry.state == "running",
                name: entry.name,
                state: entry.state,
            })
            .collect();

        Ok(containers)
    }

    /// Wraps the start action as the controller's injectable seam.
    pub fn start_fn(self: &Arc<Self>) -> StartFn {
        let runtime = Arc::clone(self);
        Arc::new(move || {
            let runtime = Arc::clone(&runtime);
            Box::pin(async move { runtime.start().await })
                as Pin<Box<dyn Future<Output = Result<StartOutcome>> + Send>>
        })
    }

    /// Wraps the stop action as the controller's injectable seam.
    pub fn stop_fn(self: &Arc<Self>) -> StopFn {
        let runtime = Arc::clone(self);
        Arc::new(move || {
            let runtime = Arc::clone(&runtime);
            Box::pin(async move { runtime.stop().await })
                as Pin<Box<dyn Future<Output = Result<()>> + Send>>
        })
    }
}
