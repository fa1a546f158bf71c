//! Request Passthrough Module
//!
//! Forwards GROBID API calls to the backing service: document uploads
//! (multipart), citation parsing (urlencoded form), and plain liveness /
//! version queries. One generic forwarding routine serves all upload
//! endpoints; the per-endpoint handlers only pick the path and timeout.
//!
//! Extraction endpoints are gated on the readiness snapshot and emit
//! `extraction_start` / `extraction_success` / `extraction_failure` events
//! through the broadcaster as a side effect of proxying.

pub mod client;
pub mod handlers;

pub use client::ProxyClient;
