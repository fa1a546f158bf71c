use reqwest::StatusCode;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use super::types::ProbeFn;

/// Per-probe request timeout. A backend that cannot answer within this is
/// not ready, whatever the reason.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Liveness probe against the backing service.
///
/// Ready means exactly: `HTTP 200` with a body that trims to the literal
/// `"true"`. Anything else, including transport errors and timeouts, counts
/// as not-ready and is never propagated.
pub struct BackendProbe {
    client: reqwest::Client,
    url: String,
}

impl BackendProbe {
    /// Probe for the service rooted at `backend_base` (no trailing slash).
    pub fn new(backend_base: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/api/isalive", backend_base),
        }
    }

    pub async fn is_ready(&self) -> bool {
        let response = match self
            .client
            .get(&self.url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!("Liveness probe failed: {}", err);
                return false;
            }
        };

        if response.status() != StatusCode::OK {
            return false;
        }

        match response.text().await {
            Ok(body) => body.trim() == "true",
            Err(_) => false,
        }
    }

    /// Wraps the probe as the controller's injectable seam.
    pub fn into_probe_fn(self) -> ProbeFn {
        let probe = Arc::new(self);
        Arc::new(move || {
            let probe = Arc::clone(&probe);
            Box::pin(async move { probe.is_ready().await }) as Pin<Box<dyn Future<Output = bool> + Send>>
        })
    }
}
