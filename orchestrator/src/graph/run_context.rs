//! Per-run context handed to `Node::run_with_context`.

use std::fmt::Debug;

use crate::memory::RunnableConfig;

/// Context passed alongside state for a single node invocation: the run's
/// `RunnableConfig` (thread/checkpoint ids) and, when resuming after a
/// suspension, the state as of the last checkpoint.
#[derive(Debug, Clone)]
pub struct RunContext<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub config: RunnableConfig,
    pub previous: Option<S>,
}

impl<S> RunContext<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new(config: RunnableConfig) -> Self {
        Self { config, previous: None }
    }

    pub fn with_previous(mut self, previous: S) -> Self {
        self.previous = Some(previous);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_no_previous_state() {
        let ctx: RunContext<i32> = RunContext::new(RunnableConfig::default());
        assert!(ctx.previous.is_none());
    }
}
