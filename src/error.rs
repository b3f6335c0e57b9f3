//! Failure taxonomy for calls to external collaborators.

use thiserror::Error;

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Network hiccup, timeout or 5xx; worth another attempt
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Upstream asked us to back off; retrying now only makes it worse
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Credentials missing or rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Response did not match the expected schema
    #[error("Malformed upstream response: {0}")]
    UpstreamFormat(String),

    /// Video could not be downloaded or decoded
    #[error("Media unavailable: {0}")]
    Resource(String),
}

impl CollaboratorError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CollaboratorError::Transient(_))
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = format!("{}: {}", status, body.trim());
        match status.as_u16() {
            401 | 403 => CollaboratorError::Auth(detail),
            429 => CollaboratorError::RateLimited(detail),
            408 | 500..=599 => CollaboratorError::Transient(detail),
            _ => CollaboratorError::UpstreamFormat(detail),
        }
    }
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CollaboratorError::UpstreamFormat(err.to_string())
        } else if let Some(status) = err.status() {
            CollaboratorError::from_status(status, "")
        } else {
            CollaboratorError::Transient(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CollaboratorError {
    fn from(err: serde_json::Error) -> Self {
        CollaboratorError::UpstreamFormat(err.to_string())
    }
}
