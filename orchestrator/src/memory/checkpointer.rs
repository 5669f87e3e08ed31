//! Checkpointer trait and `CheckpointError` (§4.3).
//!
//! Saves and loads checkpoints keyed by `(thread_id, checkpoint_id)`.

use async_trait::async_trait;

use crate::error::ErrorKind;
use crate::memory::checkpoint::{Checkpoint, CheckpointListItem};
use crate::memory::config::RunnableConfig;

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("thread_id required")]
    ThreadIdRequired,
    #[error("checkpoint already exists for this thread_id/checkpoint_id")]
    Conflict,
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl CheckpointError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckpointError::ThreadIdRequired => ErrorKind::Validation,
            CheckpointError::Conflict => ErrorKind::Conflict,
            CheckpointError::Serialization(_) => ErrorKind::Internal,
            CheckpointError::Storage(_) => ErrorKind::Internal,
            CheckpointError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

/// Durable, structured storage of `WorkflowState` snapshots (§4.3).
///
/// **Interaction**: Injected at compile via `StateGraph::compile_with_checkpointer`;
/// `CompiledStateGraph::invoke` uses it whenever `config.thread_id` is set.
#[async_trait]
pub trait Checkpointer<S>: Send + Sync
where
    S: Clone + Send + Sync + 'static,
{
    /// Atomic write of one checkpoint row. Write-once: a second `put` for the same
    /// `(thread_id, checkpoint_id)` fails with `Conflict`.
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError>;

    /// Loads `config.checkpoint_id` if set, otherwise the thread's tip (the checkpoint not
    /// referenced as a parent by any other row).
    async fn get_tuple(&self, config: &RunnableConfig) -> Result<Option<Checkpoint<S>>, CheckpointError>;

    /// All checkpoints for a thread, oldest first.
    async fn list(&self, config: &RunnableConfig) -> Result<Vec<CheckpointListItem>, CheckpointError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_error_display_all_variants() {
        assert!(CheckpointError::ThreadIdRequired
            .to_string()
            .to_lowercase()
            .contains("thread"));
        assert!(CheckpointError::Conflict.to_string().to_lowercase().contains("exists"));
        assert!(CheckpointError::Serialization("err".into())
            .to_string()
            .to_lowercase()
            .contains("serialization"));
        assert!(CheckpointError::Storage("io".into())
            .to_string()
            .to_lowercase()
            .contains("storage"));
        assert!(CheckpointError::NotFound("id".into())
            .to_string()
            .to_lowercase()
            .contains("not found"));
    }

    #[test]
    fn conflict_maps_to_conflict_kind() {
        assert_eq!(CheckpointError::Conflict.kind(), ErrorKind::Conflict);
    }
}
