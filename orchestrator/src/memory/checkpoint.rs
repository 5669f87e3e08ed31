//! Checkpoint entity (§3): a durable snapshot of one `WorkflowState`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bumped whenever the on-disk checkpoint row shape changes incompatibly.
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// One row in the per-`thread_id` checkpoint DAG (§3 `Checkpoint`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint<S> {
    pub v: u32,
    pub checkpoint_id: String,
    pub thread_id: String,
    pub parent_checkpoint_id: Option<String>,
    pub state: S,
    pub metadata: CheckpointMetadata,
    pub created_at: DateTime<Utc>,
}

/// Summary row returned by `list` -- avoids deserializing every `state` just to enumerate
/// a thread's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointListItem {
    pub checkpoint_id: String,
    pub parent_checkpoint_id: Option<String>,
    pub metadata: CheckpointMetadata,
    pub created_at: DateTime<Utc>,
}
