use super::compose::ContainerRuntime;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_LOG_LINES: usize = 100;

#[derive(Deserialize)]
pub struct LogsParams {
    pub lines: Option<usize>,
}

#[derive(Serialize)]
pub struct LogsResponse {
    pub logs: String,
}

/// `GET /docker/logs?lines=N` — tail of the backing stack's logs.
pub async fn handle_container_logs(
    Extension(runtime): Extension<Arc<ContainerRuntime>>,
    Query(params): Query<LogsParams>,
) -> Result<Json<LogsResponse>, (StatusCode, String)> {
    let lines = params.lines.unwrap_or(DEFAULT_LOG_LINES);

    match runtime.logs(lines).await {
        Ok(logs) => Ok(Json(LogsResponse { logs })),
        Err(err) => {
            tracing::error!("Failed to read container logs: {}", err);
            Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
        }
    }
}
