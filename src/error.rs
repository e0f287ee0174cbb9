//! Typed failures of the upstream HTTP APIs.
//!
//! Clients return them inside `anyhow::Error`; callers that care about the
//! cause recover them with `err.downcast_ref::<ApiError>()`.
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to reach {api}: {source}")]
    Transport {
        api: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{api} error {status}: {body}")]
    Status {
        api: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("invalid {api} response JSON: {source}")]
    Decode {
        api: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// HTTP status for `Status` errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
