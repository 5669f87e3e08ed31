//! HITL Manager errors.

use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum HitlError {
    #[error("{0}")]
    Validation(String),
    #[error("approval request {0} is already in a terminal state")]
    Conflict(String),
    #[error("approval request not found: {0}")]
    NotFound(String),
    #[error("external approval UI unavailable: {0}")]
    UiUnavailable(String),
}

impl HitlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HitlError::Validation(_) => ErrorKind::Validation,
            HitlError::Conflict(_) => ErrorKind::Conflict,
            HitlError::NotFound(_) => ErrorKind::NotFound,
            HitlError::UiUnavailable(_) => ErrorKind::UpstreamUnavailable,
        }
    }
}
