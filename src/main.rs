use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use clap::Parser;
use std::sync::Arc;

use grobid_gateway::config::GatewayConfig;
use grobid_gateway::events::handlers::{handle_event_history, handle_event_stream};
use grobid_gateway::events::EventBroadcaster;
use grobid_gateway::proxy::handlers::{
    handle_is_alive, handle_process_citation, handle_process_fulltext, handle_process_header,
    handle_version,
};
use grobid_gateway::proxy::ProxyClient;
use grobid_gateway::readiness::handlers::{handle_health, handle_restart, handle_status};
use grobid_gateway::readiness::{
    BackendProbe, ReadinessConfig, ReadinessController, ReadinessState,
};
use grobid_gateway::runtime::handlers::handle_container_logs;
use grobid_gateway::runtime::ContainerRuntime;

/// Upload size ceiling for forwarded documents.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = Arc::new(GatewayConfig::parse());
    let backend_base = config.backend_base();

    tracing::info!("Backend service at {}", backend_base);
    tracing::info!("Compose file: {:?}", config.compose_file);

    // 1. Broadcast core:
    let broadcaster = EventBroadcaster::new(config.max_history, config.max_queue);

    // 2. Container runtime + readiness controller:
    let runtime = ContainerRuntime::new(config.compose_file.clone());
    let probe = BackendProbe::new(&backend_base);
    let controller = ReadinessController::new(
        broadcaster.clone(),
        probe.into_probe_fn(),
        runtime.start_fn(),
        runtime.stop_fn(),
        ReadinessConfig::default(),
    );

    // 3. Bring the backend up in the background. Traffic is accepted
    //    immediately; dependent endpoints gate on the readiness snapshot.
    let startup = controller.clone();
    tokio::spawn(async move {
        match startup.ensure_ready().await {
            Ok(ReadinessState::Ready) => tracing::info!("Backend is ready"),
            Ok(state) => tracing::error!("Backend did not become ready: {:?}", state),
            Err(err) => tracing::error!("Backend start failed: {}", err),
        }
    });

    // 4. HTTP Router:
    let proxy_client = ProxyClient::new(backend_base);
    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .route("/events/stream", get(handle_event_stream))
        .route("/events/history", get(handle_event_history))
        .route("/docker/restart", post(handle_restart))
        .route("/docker/logs", get(handle_container_logs))
        .route("/api/isalive", get(handle_is_alive))
        .route("/api/version", get(handle_version))
        .route("/api/processFulltextDocument", post(handle_process_fulltext))
        .route("/api/processHeaderDocument", post(handle_process_header))
        .route("/api/processCitation", post(handle_process_citation))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(Extension(broadcaster))
        .layer(Extension(controller.clone()))
        .layer(Extension(runtime))
        .layer(Extension(proxy_client))
        .layer(Extension(config.clone()));

    // 5. Serve until shutdown, then stop the backing containers:
    tracing::info!("Gateway listening on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down, stopping backend containers");
    controller.stop().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
}
