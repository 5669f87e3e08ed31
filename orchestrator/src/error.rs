//! Cross-cutting error taxonomy (§7): every subsystem error eventually maps to one of these kinds
//! so the HTTP layer can surface a uniform `{error_kind, message, details?}` body.

use thiserror::Error;

use crate::bus::BusError;
use crate::catalog::CatalogError;
use crate::locks::LockError;
use crate::memory::CheckpointError;
use crate::hitl::HitlError;

/// The `error_kind` values from §7, attached to every user-visible failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Locked,
    Timeout,
    UpstreamUnavailable,
    PermissionDenied,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Locked => "locked",
            ErrorKind::Timeout => "timeout",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Top-level orchestrator error. Every subsystem error converts into this so a single
/// `kind()` dispatch drives the HTTP mapping in `orchestrator-serve`.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Hitl(#[from] HitlError),
    #[error("bus: {0}")]
    Bus(#[from] BusError),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::Validation(_) => ErrorKind::Validation,
            OrchestratorError::NotFound(_) => ErrorKind::NotFound,
            OrchestratorError::Conflict(_) => ErrorKind::Conflict,
            OrchestratorError::Lock(e) => e.kind(),
            OrchestratorError::Checkpoint(e) => e.kind(),
            OrchestratorError::Catalog(e) => e.kind(),
            OrchestratorError::Hitl(e) => e.kind(),
            OrchestratorError::Bus(_) => ErrorKind::Internal,
            OrchestratorError::Timeout(_) => ErrorKind::Timeout,
            OrchestratorError::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            OrchestratorError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            OrchestratorError::Internal(_) => ErrorKind::Internal,
        }
    }
}
