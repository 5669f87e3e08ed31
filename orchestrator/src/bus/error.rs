//! Event Bus errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("request timed out waiting for a reply")]
    Timeout,
    #[error("remote channel unavailable: {0}")]
    RemoteUnavailable(String),
}
