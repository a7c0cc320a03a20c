//! LLM error types.

use thiserror::Error;

/// Errors that can occur when calling an upstream provider.
#[derive(Debug, Error)]
pub enum LLMError {
    /// HTTP request failed before a status was received (DNS, connect, reset, timeout)
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// API returned a non-success status
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// API returned success but the body could not be used
    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

impl LLMError {
    /// HTTP status reported by the upstream, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            LLMError::Request(e) => e.status().map(|s| s.as_u16()),
            LLMError::Api { status, .. } => Some(*status),
            LLMError::MalformedBody(_) => None,
        }
    }
}

/// Upper bound on how much of an error body is read from an upstream.
pub const MAX_ERROR_BODY_BYTES: usize = 8 * 1024;

/// Turn a non-success response into `LLMError::Api`.
///
/// At most [`MAX_ERROR_BODY_BYTES`] of the body are read; the rest is
/// discarded with the connection.
pub async fn check_status(
    mut response: reqwest::Response,
) -> Result<reqwest::Response, LLMError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();

    let mut body = Vec::new();
    while body.len() < MAX_ERROR_BODY_BYTES {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) | Err(_) => break,
        }
    }
    body.truncate(MAX_ERROR_BODY_BYTES);
    let message = String::from_utf8_lossy(&body).into_owned();

    Err(LLMError::Api { status, message })
}
