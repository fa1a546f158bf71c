use super::client::{FilePart, ProxyClient};
use crate::events::EventBroadcaster;
use crate::readiness::ReadinessController;

use anyhow::Result;
use axum::extract::Multipart;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form, Json};
use std::sync::Arc;
use std::time::{Duration, Instant};

// Per-endpoint forwarding timeouts. Fulltext extraction of a large PDF can
// legitimately take minutes.
const FULLTEXT_TIMEOUT: Duration = Duration::from_secs(300);
const HEADER_TIMEOUT: Duration = Duration::from_secs(120);
const CITATION_TIMEOUT: Duration = Duration::from_secs(60);
const PASSTHROUGH_TIMEOUT: Duration = Duration::from_secs(10);

/// `GET /api/isalive` — plain text passthrough, ungated.
pub async fn handle_is_alive(Extension(client): Extension<Arc<ProxyClient>>) -> Response {
    forward_text(&client, "/api/isalive").await
}

/// `GET /api/version` — plain text passthrough, ungated.
pub async fn handle_version(Extension(client): Extension<Arc<ProxyClient>>) -> Response {
    forward_text(&client, "/api/version").await
}

/// `POST /api/processFulltextDocument` — full structured-text extraction.
pub async fn handle_process_fulltext(
    Extension(client): Extension<Arc<ProxyClient>>,
    Extension(broadcaster): Extension<Arc<EventBroadcaster>>,
    Extension(controller): Extension<Arc<ReadinessController>>,
    multipart: Multipart,
) -> Response {
    forward_extraction(
        &client,
        &broadcaster,
        &controller,
        "processFulltextDocument",
        FULLTEXT_TIMEOUT,
        multipart,
    )
    .await
}

/// `POST /api/processHeaderDocument` — header metadata extraction only.
pub async fn handle_process_header(
    Extension(client): Extension<Arc<ProxyClient>>,
    Extension(broadcaster): Extension<Arc<EventBroadcaster>>,
    Extension(controller): Extension<Arc<ReadinessController>>,
    multipart: Multipart,
) -> Response {
    forward_extraction(
        &client,
        &broadcaster,
        &controller,
        "processHeaderDocument",
        HEADER_TIMEOUT,
        multipart,
    )
    .await
}

/// `POST /api/processCitation` — raw citation parsing, urlencoded form.
pub async fn handle_process_citation(
    Extension(client): Extension<Arc<ProxyClient>>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    match client
        .forward_form("/api/processCitation", CITATION_TIMEOUT, fields)
        .await
    {
        Ok((status, body)) => xml_response(status, body),
        Err(err) => {
            tracing::error!("Citation forward failed: {}", err);
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        }
    }
}

/// Shared forwarding path for the upload endpoints: readiness gate, event
/// emission around the forward, verbatim status and body relay.
async fn forward_extraction(
    client: &ProxyClient,
    broadcaster: &EventBroadcaster,
    controller: &ReadinessController,
    endpoint: &str,
    timeout: Duration,
    mut multipart: Multipart,
) -> Response {
    if !controller.is_ready().await {
        let state = controller.state().await;
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "error": "backend not ready",
                "state": state,
            })),
        )
            .into_response();
    }

    let (file, fields) = match collect_upload(&mut multipart).await {
        Ok(parts) => parts,
        Err(err) => {
            tracing::warn!("Rejected upload for {}: {}", endpoint, err);
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };

    let filename = file.filename.clone();
    let file_size_kb = (file.data.len() / 1024) as u64;
    broadcaster.emit_extraction_start(&filename, endpoint, file_size_kb);

    tracing::info!("Forwarding {} ({} KB) to {}", filename, file_size_kb, endpoint);
    let started = Instant::now();

    match client
        .forward_multipart(&format!("/api/{}", endpoint), timeout, file, fields)
        .await
    {
        Ok((status, body)) => {
            let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
            broadcaster.emit_extraction_success(
                &filename,
                endpoint,
                latency_ms,
                (body.len() / 1024) as u64,
                status,
            );
            xml_response(status, body)
        }
        Err(err) => {
            let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
            broadcaster.emit_extraction_failure(&filename, endpoint, &err.to_string(), latency_ms);
            tracing::error!("Extraction {} failed for {}: {}", endpoint, filename, err);
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        }
    }
}

/// Drains the inbound multipart body: the document under `input` plus any
/// scalar fields, which are forwarded untouched.
async fn collect_upload(multipart: &mut Multipart) -> Result<(FilePart, Vec<(String, String)>)> {
    let mut file = None;
    let mut fields = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "input" {
            let filename = field
                .file_name()
                .unwrap_or("document.pdf")
                .to_string();
            let content_type = field.content_type().map(|mime| mime.to_string());
            let data = field.bytes().await?.to_vec();
            file = Some(FilePart {
                filename,
                content_type,
                data,
            });
        } else {
            let value = field.text().await?;
            fields.push((name, value));
        }
    }

    match file {
        Some(file) => Ok((file, fields)),
        None => anyhow::bail!("missing 'input' file field"),
    }
}

fn xml_response(status: u16, body: Vec<u8>) -> Response {
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
        [(header::CONTENT_TYPE, "application/xml")],
        body,
    )
        .into_response()
}

async fn forward_text(client: &ProxyClient, path: &str) -> Response {
    match client.forward_get(path, PASSTHROUGH_TIMEOUT).await {
        Ok((status, body)) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            [(header::CONTENT_TYPE, "text/plain")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}
