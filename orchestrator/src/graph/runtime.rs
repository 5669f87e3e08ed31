//! Engine-level runtime context: run-scoped dependencies plus the previous
//! state for a thread, bundled for convenience when wiring up a graph run.

use std::fmt::Debug;

use crate::memory::RunnableConfig;

/// Bundles run-scoped context (`C`, e.g. a database handle or user id) with
/// the previous state for the thread and the run's config.
#[derive(Debug, Clone)]
pub struct Runtime<C, S>
where
    C: Clone + Send + Sync + Debug + 'static,
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Static context for the run, e.g. `user_id`, `db_conn`. Run dependencies.
    pub context: Option<C>,

    /// The previous return value for the given thread, when resuming a run
    /// from a checkpoint.
    pub previous: Option<S>,

    /// Config for the current run (thread_id, checkpoint id).
    pub config: RunnableConfig,
}

impl<C, S> Runtime<C, S>
where
    C: Clone + Send + Sync + Debug + 'static,
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new(config: RunnableConfig) -> Self {
        Self {
            context: None,
            previous: None,
            config,
        }
    }

    pub fn with_context(mut self, context: C) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_previous(mut self, previous: S) -> Self {
        self.previous = Some(previous);
        self
    }

    /// Merges two runtimes: values missing from `other` fall back to `self`;
    /// `config` always comes from `other` (the more recent run).
    pub fn merge(mut self, other: Runtime<C, S>) -> Self {
        if other.context.is_some() {
            self.context = other.context;
        }
        if other.previous.is_some() {
            self.previous = other.previous;
        }
        self.config = other.config;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_runtime_has_no_context_or_previous() {
        let runtime = Runtime::<String, String>::new(RunnableConfig::default());
        assert!(runtime.context.is_none());
        assert!(runtime.previous.is_none());
    }

    #[test]
    fn with_context_sets_context() {
        let runtime: Runtime<String, String> =
            Runtime::new(RunnableConfig::default()).with_context("user_123".to_string());
        assert_eq!(runtime.context, Some("user_123".to_string()));
    }

    #[test]
    fn merge_prefers_other_when_present() {
        let runtime1: Runtime<String, String> = Runtime::new(RunnableConfig::default())
            .with_context("user_123".to_string())
            .with_previous("state1".to_string());
        let runtime2: Runtime<String, String> =
            Runtime::new(RunnableConfig::default()).with_previous("state2".to_string());

        let merged = runtime1.merge(runtime2);
        assert_eq!(merged.context, Some("user_123".to_string()));
        assert_eq!(merged.previous, Some("state2".to_string()));
    }
}
