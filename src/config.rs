use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Command-line configuration for the gateway binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "grobid-gateway", version, about)]
pub struct GatewayConfig {
    /// Address the gateway listens on.
    #[arg(long, default_value = "0.0.0.0:8071")]
    pub bind: SocketAddr,

    /// Base URL of the backing GROBID service.
    #[arg(long, default_value = "http://localhost:8070")]
    pub backend_url: String,

    /// Path to the docker-compose file that defines the backing service.
    #[arg(long, default_value = "docker/docker-compose.yml")]
    pub compose_file: PathBuf,

    /// Maximum number of events retained for history replay.
    #[arg(long, default_value_t = 100)]
    pub max_history: usize,

    /// Per-subscriber mailbox capacity.
    #[arg(long, default_value_t = 100)]
    pub max_queue: usize,
}

impl GatewayConfig {
    /// Backend URL with any trailing slash removed.
    pub fn backend_base(&self) -> String {
        self.backend_url.trim_end_matches('/').to_string()
    }
}
