//! Mapping of HTTP failures onto [`ApiError`].

use ielts_core::error::ApiError;
use serde::Deserialize;

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: String,
}

/// Classify a transport-level failure.
pub(crate) fn transport_error(e: reqwest::Error, timeout_secs: u64) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout(timeout_secs)
    } else {
        ApiError::Network(e.to_string())
    }
}

/// Classify a non-success response. `body` is the raw response text.
pub(crate) fn status_error(status: u16, body: String, what: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or(body);
    match status {
        401 | 403 => ApiError::Unauthorized(message),
        404 => ApiError::NotFound(what.to_string()),
        _ => ApiError::Http { status, message },
    }
}
