//! Per-call addressing for the Checkpoint Store.

/// Identifies which thread (and, optionally, which exact checkpoint) a `Checkpointer`
/// call addresses. Mirrors the LangGraph-style `RunnableConfig.configurable` shape the
/// graph runtime already threads through node invocations.
#[derive(Debug, Clone, Default)]
pub struct RunnableConfig {
    pub thread_id: Option<String>,
    /// When set, `get_tuple` returns exactly this checkpoint instead of the thread's tip.
    pub checkpoint_id: Option<String>,
}

impl RunnableConfig {
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            checkpoint_id: None,
        }
    }

    pub fn for_checkpoint(thread_id: impl Into<String>, checkpoint_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            checkpoint_id: Some(checkpoint_id.into()),
        }
    }
}
