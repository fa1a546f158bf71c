use super::controller::ReadinessController;
use super::types::ReadinessState;
use crate::config::GatewayConfig;
use crate::events::EventBroadcaster;
use crate::runtime::{ContainerRuntime, ContainerStatus};

use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub state: ReadinessState,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub state: ReadinessState,
    pub backend_url: String,
    pub subscribers: usize,
    pub events_recorded: u64,
    pub containers: Vec<ContainerStatus>,
}

#[derive(Serialize)]
pub struct RestartResponse {
    pub status: &'static str,
    pub ready: bool,
}

/// `GET /health` — 200 only when the controller snapshot says `Ready`.
pub async fn handle_health(
    Extension(controller): Extension<Arc<ReadinessController>>,
) -> (StatusCode, Json<HealthResponse>) {
    let state = controller.state().await;

    if state == ReadinessState::Ready {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                state,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable",
                state,
            }),
        )
    }
}

/// `GET /status` — detailed snapshot for operators.
pub async fn handle_status(
    Extension(controller): Extension<Arc<ReadinessController>>,
    Extension(broadcaster): Extension<Arc<EventBroadcaster>>,
    Extension(runtime): Extension<Arc<ContainerRuntime>>,
    Extension(config): Extension<Arc<GatewayConfig>>,
) -> Json<StatusResponse> {
    let containers = match runtime.ps().await {
        Ok(containers) => containers,
        Err(err) => {
            tracing::warn!("Failed to list containers: {}", err);
            Vec::new()
        }
    };

    Json(StatusResponse {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        state: controller.state().await,
        backend_url: config.backend_base(),
        subscribers: broadcaster.subscriber_count(),
        events_recorded: broadcaster.total_recorded(),
        containers,
    })
}

/// `POST /docker/restart` — restart the backing containers and report whether
/// readiness was reached within the restart budget.
pub async fn handle_restart(
    Extension(controller): Extension<Arc<ReadinessController>>,
) -> Result<Json<RestartResponse>, (StatusCode, String)> {
    match controller.restart().await {
        Ok(ready) => Ok(Json(RestartResponse {
            status: "restarted",
            ready,
        })),
        Err(err) => {
            tracing::error!("Restart failed: {}", err);
            Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
        }
    }
}
