//! Error taxonomy shared by every pipeline stage.
//!
//! Each variant is a stable error kind a caller can match on:
//! - [`AdvisorError::InvalidInput`]: detected before any network call
//! - [`AdvisorError::InvalidState`]: precondition on stored data not met
//! - [`AdvisorError::UpstreamUnavailable`]: provider unreachable or rate-limited
//! - [`AdvisorError::MalformedResponse`]: provider returned unusable content
//! - [`AdvisorError::NotFound`]: referenced entity does not exist
//! - [`AdvisorError::Storage`]: underlying SQLite failure

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl AdvisorError {
    /// Stable machine-readable kind for user-visible failure results.
    pub fn kind(&self) -> &'static str {
        match self {
            AdvisorError::InvalidInput(_) => "invalid_input",
            AdvisorError::InvalidState(_) => "invalid_state",
            AdvisorError::UpstreamUnavailable(_) => "upstream_unavailable",
            AdvisorError::MalformedResponse(_) => "malformed_response",
            AdvisorError::NotFound(_) => "not_found",
            AdvisorError::Storage(_) => "storage_failure",
        }
    }
}

pub type Result<T> = std::result::Result<T, AdvisorError>;
