//! Tool Catalog errors.

use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    #[error("agent profile not found: {0}")]
    AgentProfileNotFound(String),
    #[error("tool already registered: {0}")]
    DuplicateTool(String),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::ToolNotFound(_) => ErrorKind::NotFound,
            CatalogError::AgentProfileNotFound(_) => ErrorKind::NotFound,
            CatalogError::DuplicateTool(_) => ErrorKind::Conflict,
        }
    }
}
