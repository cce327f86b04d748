//! Error types shared across the workspace.
//!
//! `ApiError` lives in `ielts-core` so the submission dispatcher can classify
//! failures (authorization vs. transport vs. server) without string matching.

use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend rejected the session token (HTTP 401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Returns `true` if the user has to log in again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// HTTP status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::NotFound(_) => Some(404),
            _ => None,
        }
    }
}

/// Errors raised by the test-taking session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("the attempt has already been submitted")]
    AlreadySubmitted,

    #[error("section index {index} out of range (test has {count} sections)")]
    SectionOutOfRange { index: usize, count: usize },
}

/// Errors raised by submission state transitions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("submission {id} has already been graded")]
    AlreadyGraded { id: String },
}

/// Errors raised while resolving or loading media.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("media URL is empty")]
    Empty,

    #[error("cannot resolve media reference without a legacy media host: {0}")]
    Unresolvable(String),

    #[error("unsupported media URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid media URL: {0}")]
    Invalid(String),

    #[error("retry is only available after a failed load")]
    NotFailed,
}

/// Client-side input validation failures. These block a request before any
/// network call is made.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("grade must be a band score between 0 and 9 in half-band steps, got {0}")]
    InvalidBand(f64),
}
