//! In-memory `Checkpointer` (§4.3). Used by tests and by `Settings::checkpoint_db_path`
//! being empty -- no cross-restart durability, but the same write-once contract.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata};
use super::checkpointer::{CheckpointError, Checkpointer};
use super::config::RunnableConfig;

#[derive(Default)]
pub struct MemorySaver<S> {
    // keyed by thread_id -> checkpoint_id -> row, insertion order tracked separately.
    rows: Mutex<HashMap<String, Vec<(String, Option<String>, S, CheckpointMetadata, chrono::DateTime<chrono::Utc>)>>>,
}

impl<S> MemorySaver<S> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<S> Checkpointer<S> for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(&self, config: &RunnableConfig, checkpoint: &Checkpoint<S>) -> Result<String, CheckpointError> {
        let thread_id = config.thread_id.clone().ok_or(CheckpointError::ThreadIdRequired)?;
        let mut rows = self.rows.lock().unwrap();
        let thread_rows = rows.entry(thread_id).or_default();
        if thread_rows.iter().any(|(id, ..)| id == &checkpoint.checkpoint_id) {
            return Err(CheckpointError::Conflict);
        }
        thread_rows.push((
            checkpoint.checkpoint_id.clone(),
            checkpoint.parent_checkpoint_id.clone(),
            checkpoint.state.clone(),
            checkpoint.metadata.clone(),
            checkpoint.created_at,
        ));
        Ok(checkpoint.checkpoint_id.clone())
    }

    async fn get_tuple(&self, config: &RunnableConfig) -> Result<Option<Checkpoint<S>>, CheckpointError> {
        let thread_id = config.thread_id.clone().ok_or(CheckpointError::ThreadIdRequired)?;
        let rows = self.rows.lock().unwrap();
        let Some(thread_rows) = rows.get(&thread_id) else {
            return Ok(None);
        };

        let found = if let Some(want_id) = &config.checkpoint_id {
            thread_rows.iter().find(|(id, ..)| id == want_id)
        } else {
            let parents: std::collections::HashSet<&str> = thread_rows
                .iter()
                .filter_map(|(_, parent, ..)| parent.as_deref())
                .collect();
            thread_rows.iter().rev().find(|(id, ..)| !parents.contains(id.as_str()))
        };

        Ok(found.map(|(id, parent, state, metadata, created_at)| Checkpoint {
            v: super::checkpoint::CHECKPOINT_VERSION,
            checkpoint_id: id.clone(),
            thread_id: thread_id.clone(),
            parent_checkpoint_id: parent.clone(),
            state: state.clone(),
            metadata: metadata.clone(),
            created_at: *created_at,
        }))
    }

    async fn list(&self, config: &RunnableConfig) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let thread_id = config.thread_id.clone().ok_or(CheckpointError::ThreadIdRequired)?;
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .get(&thread_id)
            .map(|thread_rows| {
                thread_rows
                    .iter()
                    .map(|(id, parent, _, metadata, created_at)| CheckpointListItem {
                        checkpoint_id: id.clone(),
                        parent_checkpoint_id: parent.clone(),
                        metadata: metadata.clone(),
                        created_at: *created_at,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn checkpoint(id: &str, parent: Option<&str>, state: &str) -> Checkpoint<String> {
        Checkpoint {
            v: 1,
            checkpoint_id: id.into(),
            thread_id: "thread-1".into(),
            parent_checkpoint_id: parent.map(String::from),
            state: state.into(),
            metadata: CheckpointMetadata::default(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn tip_is_the_row_with_no_children() {
        let saver: MemorySaver<String> = MemorySaver::new();
        let config = RunnableConfig::for_thread("thread-1");
        saver.put(&config, &checkpoint("c1", None, "first")).await.unwrap();
        saver.put(&config, &checkpoint("c2", Some("c1"), "second")).await.unwrap();
        let tip = saver.get_tuple(&config).await.unwrap().unwrap();
        assert_eq!(tip.checkpoint_id, "c2");
    }

    #[tokio::test]
    async fn duplicate_checkpoint_id_conflicts() {
        let saver: MemorySaver<String> = MemorySaver::new();
        let config = RunnableConfig::for_thread("thread-1");
        saver.put(&config, &checkpoint("c1", None, "first")).await.unwrap();
        let result = saver.put(&config, &checkpoint("c1", None, "dup")).await;
        assert!(matches!(result, Err(CheckpointError::Conflict)));
    }
}
