//! Resource Lock Manager errors.

use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("resource {0} is held by another owner")]
    Busy(String),
    #[error("timed out after {0:?} waiting for resource")]
    WaitTimeout(std::time::Duration),
    #[error("token mismatch releasing {0}: not held by this owner")]
    NotHeld(String),
}

impl LockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LockError::Busy(_) => ErrorKind::Locked,
            LockError::WaitTimeout(_) => ErrorKind::Timeout,
            LockError::NotHeld(_) => ErrorKind::Conflict,
        }
    }
}
