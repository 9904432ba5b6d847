//! Shared HTTP plumbing for the remote adapters

use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::errors::{RagError, Result};

/// Build a client with a per-request deadline
pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RagError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Whether an HTTP status is worth retrying
pub(crate) fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// Transport failures (connect, timeout, reset) are transient
pub(crate) fn is_retryable_transport(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

/// Map a transport failure into a generation error
pub(crate) fn generation_transport_error(error: reqwest::Error) -> RagError {
    RagError::Generation {
        retryable: is_retryable_transport(&error),
        message: format!("Request failed: {}", error),
    }
}

/// Map a non-success response into a generation error
pub(crate) fn generation_status_error(status: StatusCode, body: &str) -> RagError {
    RagError::Generation {
        retryable: is_retryable_status(status),
        message: format!("HTTP {}: {}", status, truncate(body, 200)),
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
