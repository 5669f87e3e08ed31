//! SQLite-backed checkpointer (§4.3). Durable across process restarts; every write goes
//! through `spawn_blocking` since `rusqlite::Connection` is sync.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::params;

use crate::memory::checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata, CHECKPOINT_VERSION};
use crate::memory::checkpointer::{CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;
use crate::memory::serializer::Serializer;

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Persistent checkpointer. Key: `(thread_id, checkpoint_id)`.
///
/// **Interaction**: used as `Arc<dyn Checkpointer<S>>` wherever the Workflow Engine needs
/// durability; the in-memory `MemorySaver` is its drop-in replacement for tests.
pub struct SqliteSaver<S> {
    db_path: std::path::PathBuf,
    serializer: Arc<dyn Serializer<S> + Send + Sync>,
}

impl<S> SqliteSaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(
        path: impl AsRef<Path>,
        serializer: Arc<dyn Serializer<S> + Send + Sync>,
    ) -> Result<Self, CheckpointError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&db_path).map_err(|e| CheckpointError::Storage(e.to_string()))?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id TEXT NOT NULL,
                checkpoint_id TEXT NOT NULL,
                parent_checkpoint_id TEXT,
                state BLOB NOT NULL,
                metadata TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (thread_id, checkpoint_id)
            )
            "#,
            [],
        )
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        Ok(Self { db_path, serializer })
    }

    fn thread_id_required(config: &RunnableConfig) -> Result<String, CheckpointError> {
        config
            .thread_id
            .as_deref()
            .ok_or(CheckpointError::ThreadIdRequired)
            .map(String::from)
    }
}

#[async_trait]
impl<S> Checkpointer<S> for SqliteSaver<S>
where
    S: Clone + Send + Sync + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    async fn put(&self, config: &RunnableConfig, checkpoint: &Checkpoint<S>) -> Result<String, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let state_bytes = self.serializer.serialize(&checkpoint.state)?;
        let metadata_json =
            serde_json::to_string(&checkpoint.metadata).map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        let checkpoint_id = checkpoint.checkpoint_id.clone();
        let parent_checkpoint_id = checkpoint.parent_checkpoint_id.clone();
        let created_at = checkpoint.created_at.to_rfc3339();
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(|e| CheckpointError::Storage(e.to_string()))?;
            // Plain INSERT, not INSERT OR REPLACE: a second write for the same key is a
            // protocol violation (write-once per checkpoint_id), surfaced as Conflict.
            conn.execute(
                r#"
                INSERT INTO checkpoints
                (thread_id, checkpoint_id, parent_checkpoint_id, state, metadata, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    thread_id,
                    checkpoint_id,
                    parent_checkpoint_id,
                    state_bytes,
                    metadata_json,
                    created_at,
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    CheckpointError::Conflict
                } else {
                    CheckpointError::Storage(e.to_string())
                }
            })?;
            Ok::<String, CheckpointError>(checkpoint.checkpoint_id.clone())
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?
    }

    async fn get_tuple(&self, config: &RunnableConfig) -> Result<Option<Checkpoint<S>>, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let want_id = config.checkpoint_id.clone();
        let db_path = self.db_path.clone();

        type Row = (String, Option<String>, Vec<u8>, String, String);
        let row: Option<Row> = tokio::task::spawn_blocking(move || -> Result<Option<Row>, CheckpointError> {
            let conn = rusqlite::Connection::open(&db_path).map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let sql = if want_id.is_some() {
                "SELECT checkpoint_id, parent_checkpoint_id, state, metadata, created_at
                 FROM checkpoints WHERE thread_id = ?1 AND checkpoint_id = ?2"
            } else {
                // The tip is the row never referenced as a parent by another row.
                "SELECT checkpoint_id, parent_checkpoint_id, state, metadata, created_at
                 FROM checkpoints c WHERE thread_id = ?1
                 AND NOT EXISTS (SELECT 1 FROM checkpoints p WHERE p.thread_id = ?1 AND p.parent_checkpoint_id = c.checkpoint_id)
                 ORDER BY created_at DESC LIMIT 1"
            };
            let mut stmt = conn.prepare(sql).map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let mut rows = if let Some(ref cid) = want_id {
                stmt.query(params![thread_id, cid])
            } else {
                stmt.query(params![thread_id])
            }
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let row = match rows.next().map_err(|e| CheckpointError::Storage(e.to_string()))? {
                Some(r) => r,
                None => return Ok(None),
            };
            Ok(Some((
                row.get(0).map_err(|e| CheckpointError::Storage(e.to_string()))?,
                row.get(1).map_err(|e| CheckpointError::Storage(e.to_string()))?,
                row.get(2).map_err(|e| CheckpointError::Storage(e.to_string()))?,
                row.get(3).map_err(|e| CheckpointError::Storage(e.to_string()))?,
                row.get(4).map_err(|e| CheckpointError::Storage(e.to_string()))?,
            )))
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))??;

        let (checkpoint_id, parent_checkpoint_id, state_bytes, metadata_json, created_at) = match row {
            Some(r) => r,
            None => return Ok(None),
        };

        let state = self.serializer.deserialize(&state_bytes)?;
        let metadata: CheckpointMetadata =
            serde_json::from_str(&metadata_json).map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;

        Ok(Some(Checkpoint {
            v: CHECKPOINT_VERSION,
            checkpoint_id,
            thread_id: config.thread_id.clone().unwrap_or_default(),
            parent_checkpoint_id,
            state,
            metadata,
            created_at,
        }))
    }

    async fn list(&self, config: &RunnableConfig) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let db_path = self.db_path.clone();

        let items = tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let mut stmt = conn
                .prepare(
                    "SELECT checkpoint_id, parent_checkpoint_id, metadata, created_at
                     FROM checkpoints WHERE thread_id = ?1 ORDER BY created_at ASC",
                )
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(params![thread_id], |row| {
                    let metadata_json: String = row.get(2)?;
                    let created_at: String = row.get(3)?;
                    Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?, metadata_json, created_at))
                })
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let mut items = Vec::new();
            for row in rows {
                let (checkpoint_id, parent_checkpoint_id, metadata_json, created_at) =
                    row.map_err(|e| CheckpointError::Storage(e.to_string()))?;
                let metadata: CheckpointMetadata = serde_json::from_str(&metadata_json)
                    .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
                let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
                items.push(CheckpointListItem {
                    checkpoint_id,
                    parent_checkpoint_id,
                    metadata,
                    created_at,
                });
            }
            Ok::<Vec<CheckpointListItem>, CheckpointError>(items)
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))??;

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::serializer::JsonSerializer;
    use chrono::Utc;

    fn saver() -> (tempfile::TempDir, SqliteSaver<String>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoints.db");
        let saver = SqliteSaver::new(&path, Arc::new(JsonSerializer)).unwrap();
        (dir, saver)
    }

    fn checkpoint(id: &str, parent: Option<&str>, state: &str) -> Checkpoint<String> {
        Checkpoint {
            v: CHECKPOINT_VERSION,
            checkpoint_id: id.into(),
            thread_id: "thread-1".into(),
            parent_checkpoint_id: parent.map(String::from),
            state: state.into(),
            metadata: CheckpointMetadata::default(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips_state() {
        let (_dir, saver) = saver();
        let config = RunnableConfig::for_thread("thread-1");
        saver.put(&config, &checkpoint("c1", None, "hello")).await.unwrap();
        let loaded = saver.get_tuple(&config).await.unwrap().unwrap();
        assert_eq!(loaded.state, "hello");
    }

    #[tokio::test]
    async fn second_put_with_same_key_conflicts() {
        let (_dir, saver) = saver();
        let config = RunnableConfig::for_thread("thread-1");
        saver.put(&config, &checkpoint("c1", None, "first")).await.unwrap();
        let result = saver.put(&config, &checkpoint("c1", None, "second")).await;
        assert!(matches!(result, Err(CheckpointError::Conflict)));
    }

    #[tokio::test]
    async fn get_tuple_without_checkpoint_id_returns_tip() {
        let (_dir, saver) = saver();
        let config = RunnableConfig::for_thread("thread-1");
        saver.put(&config, &checkpoint("c1", None, "first")).await.unwrap();
        saver.put(&config, &checkpoint("c2", Some("c1"), "second")).await.unwrap();
        let tip = saver.get_tuple(&config).await.unwrap().unwrap();
        assert_eq!(tip.checkpoint_id, "c2");
    }

    #[tokio::test]
    async fn list_returns_full_chain_oldest_first() {
        let (_dir, saver) = saver();
        let config = RunnableConfig::for_thread("thread-1");
        saver.put(&config, &checkpoint("c1", None, "first")).await.unwrap();
        saver.put(&config, &checkpoint("c2", Some("c1"), "second")).await.unwrap();
        let items = saver.list(&config).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].checkpoint_id, "c1");
        assert_eq!(items[1].checkpoint_id, "c2");
    }

    #[tokio::test]
    async fn missing_thread_id_is_rejected() {
        let (_dir, saver) = saver();
        let config = RunnableConfig::default();
        let result = saver.put(&config, &checkpoint("c1", None, "x")).await;
        assert!(matches!(result, Err(CheckpointError::ThreadIdRequired)));
    }
}
