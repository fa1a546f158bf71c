use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// An uploaded document, re-posted verbatim to the backend.
pub struct FilePart {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Outbound client for the backing GROBID API.
pub struct ProxyClient {
    http: reqwest::Client,
    base: String,
}

impl ProxyClient {
    /// Client for the service rooted at `backend_base` (no trailing slash).
    pub fn new(backend_base: String) -> Arc<Self> {
        Arc::new(Self {
            http: reqwest::Client::new(),
            base: backend_base,
        })
    }

    /// Plain GET passthrough, returning status and text body.
    pub async fn forward_get(&self, path: &str, timeout: Duration) -> Result<(u16, String)> {
        let response = self
            .http
            .get(format!("{}{}", self.base, path))
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// Multipart POST passthrough: the file under the `input` part plus any
    /// scalar form fields, forwarded as-is.
    pub async fn forward_multipart(
        &self,
        path: &str,
        timeout: Duration,
        file: FilePart,
        fields: Vec<(String, String)>,
    ) -> Result<(u16, Vec<u8>)> {
        let mut part = reqwest::multipart::Part::bytes(file.data).file_name(file.filename);
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type)?;
        }

        let mut form = reqwest::multipart::Form::new().part("input", part);
        for (name, value) in fields {
            form = form.text(name, value);
        }

        let response = self
            .http
            .post(format!("{}{}", self.base, path))
            .multipart(form)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok((status, body))
    }

    /// Urlencoded form POST passthrough.
    pub async fn forward_form(
        &self,
        path: &str,
        timeout: Duration,
        fields: Vec<(String, String)>,
    ) -> Result<(u16, Vec<u8>)> {
        let response = self
            .http
            .post(format!("{}{}", self.base, path))
            .form(&fields)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok((status, body))
    }
}
