//! Global HTTP client singleton.
//!
//! Provides a shared HTTP client instance to avoid recreating clients for each
//! fallback transcription request. This eliminates the TLS handshake overhead
//! and root certificate store population that happens when creating a new client.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dictate_core::http::get_http_client;
//!
//! let client = get_http_client()?;
//! ```

use anyhow::{Context, Result};
use std::sync::OnceLock;
use std::time::Duration;

/// Timeout for the one-shot fallback transcription request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get the global HTTP client, creating it if necessary.
pub fn get_http_client() -> Result<&'static reqwest::Client> {
    if let Some(client) = HTTP_CLIENT.get() {
        return Ok(client);
    }
    let client = create_http_client()?;
    Ok(HTTP_CLIENT.get_or_init(|| client))
}

/// Pre-warm the HTTP client. If already initialized, returns immediately.
pub fn warmup_http_client() -> Result<()> {
    get_http_client()?;
    Ok(())
}

/// Check if the HTTP client is already initialized.
pub fn is_http_client_ready() -> bool {
    HTTP_CLIENT.get().is_some()
}

fn create_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .context("Failed to create HTTP client")
}
