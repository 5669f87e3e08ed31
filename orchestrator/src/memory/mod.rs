//! Checkpoint Store (§4.3): durable, structured storage of `WorkflowState` snapshots.
//!
//! Keys checkpoints by `(thread_id, checkpoint_id)`, forming a per-thread DAG via
//! `parent_checkpoint_id` (usually a chain). [`MemorySaver`] is the in-memory
//! implementation used by tests and the default in-memory deployment mode; [`SqliteSaver`]
//! is the durable, single-node implementation the Workflow Engine uses whenever
//! `Settings::checkpoint_db_path` is set.

mod checkpoint;
mod checkpointer;
mod config;
mod memory_saver;
mod serializer;
mod sqlite_saver;
pub mod uuid6;

pub use checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata, CHECKPOINT_VERSION};
pub use checkpointer::{CheckpointError, Checkpointer};
pub use config::RunnableConfig;
pub use memory_saver::MemorySaver;
pub use serializer::{JsonSerializer, Serializer};
pub use sqlite_saver::SqliteSaver;
pub use uuid6::uuid6;
