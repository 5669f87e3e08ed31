//! `CompiledStateGraph`: the executable form of a `StateGraph`, produced by
//! `StateGraph::compile*`. Walks nodes from `first_node_id`, following either
//! the statically compiled edge order or a conditional router, applying the
//! state updater after each step and persisting a checkpoint when a
//! checkpointer and `thread_id` are configured.

use std::collections::HashMap;
use std::fmt::Debug;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::error::OrchestratorError;
use crate::memory::{Checkpoint, CheckpointMetadata, Checkpointer, RunnableConfig};
use crate::memory::uuid6;

use super::conditional::NextEntry;
use super::interrupt::{GraphInterrupt, Interrupt, InterruptHandler};
use super::logging::{log_graph_complete, log_graph_error, log_graph_start, log_state_update};
use super::node::Node;
use super::node_middleware::NodeMiddleware;
use super::run_context::RunContext;
use super::state_updater::BoxedStateUpdater;
use super::Next;

/// Outcome of `CompiledStateGraph::invoke`.
#[derive(Debug, Clone)]
pub enum InvokeOutcome<S> {
    /// The run reached `END`; this is the final state.
    Completed(S),
    /// A node raised a `GraphInterrupt` and the interrupt handler chose to
    /// suspend; `state` is the state as of the interrupting node's output,
    /// persisted as the tip checkpoint so a later `resume` can continue from it.
    Suspended { state: S, interrupt: GraphInterrupt },
}

pub struct CompiledStateGraph<S> {
    pub(crate) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(crate) first_node_id: String,
    pub(crate) edge_order: Vec<String>,
    pub(crate) next_map: HashMap<String, NextEntry<S>>,
    pub(crate) checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    pub(crate) middleware: Option<Arc<dyn NodeMiddleware<S>>>,
    pub(crate) state_updater: BoxedStateUpdater<S>,
    pub(crate) retry_policy: super::retry::RetryPolicy,
    pub(crate) interrupt_handler: Option<Arc<dyn InterruptHandler>>,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Node ids registered via `StateGraph::add_node` (not `START`/`END`).
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.keys().map(|s| s.as_str()).collect()
    }

    pub fn first_node_id(&self) -> &str {
        &self.first_node_id
    }

    /// The statically-compiled linear order, starting at `first_node_id`. Empty
    /// when the graph uses conditional edges from the start.
    pub fn edge_order(&self) -> &[String] {
        &self.edge_order
    }

    pub(crate) fn next_map(&self) -> &HashMap<String, NextEntry<S>> {
        &self.next_map
    }

    /// Runs the graph to completion or suspension, starting from `state` at the graph's
    /// entry node.
    ///
    /// When `config.thread_id` is set and a checkpointer is configured, each
    /// node's output state is persisted as a new checkpoint before the next
    /// node runs, chained to the previous checkpoint via `parent_checkpoint_id`.
    pub async fn invoke(
        &self,
        state: S,
        config: RunnableConfig,
    ) -> Result<InvokeOutcome<S>, OrchestratorError> {
        self.run_from(state, config, self.first_node_id.clone()).await
    }

    /// Runs the graph starting at `start_node_id` rather than the entry node, e.g. to
    /// resume a workflow that suspended mid-graph after its interrupt is resolved
    /// externally. Checkpointing behaves exactly as in `invoke`.
    pub async fn resume_from(
        &self,
        state: S,
        config: RunnableConfig,
        start_node_id: impl Into<String>,
    ) -> Result<InvokeOutcome<S>, OrchestratorError> {
        self.run_from(state, config, start_node_id.into()).await
    }

    async fn run_from(
        &self,
        state: S,
        config: RunnableConfig,
        start_node_id: String,
    ) -> Result<InvokeOutcome<S>, OrchestratorError> {
        let run_start = Instant::now();
        log_graph_start(config.thread_id.as_deref(), &start_node_id);

        let mut current_state = state;
        let mut current_node_id = start_node_id;
        let mut parent_checkpoint_id: Option<String> = config.checkpoint_id.clone();

        loop {
            let node = self
                .nodes
                .get(&current_node_id)
                .cloned()
                .ok_or_else(|| OrchestratorError::NotFound(current_node_id.clone()))?;

            let run_ctx = RunContext::new(config.clone()).with_previous(current_state.clone());
            let run_result = self
                .run_node_with_retry(node, current_node_id.as_str(), current_state.clone(), &run_ctx)
                .await;

            let (next_state, next) = match run_result {
                Ok(pair) => pair,
                Err(e) => {
                    log_graph_error(&current_node_id, &e.to_string());
                    return Err(e);
                }
            };

            self.state_updater.apply_update(&mut current_state, &next_state);
            log_state_update(&current_node_id);

            if let Some(checkpointer) = &self.checkpointer {
                if let Some(thread_id) = &config.thread_id {
                    let checkpoint_id = uuid6::uuid6().to_string();
                    let checkpoint = Checkpoint {
                        v: crate::memory::CHECKPOINT_VERSION,
                        checkpoint_id: checkpoint_id.clone(),
                        thread_id: thread_id.clone(),
                        parent_checkpoint_id: parent_checkpoint_id.clone(),
                        state: current_state.clone(),
                        metadata: CheckpointMetadata::default(),
                        created_at: Utc::now(),
                    };
                    let put_config = RunnableConfig::for_thread(thread_id.clone());
                    checkpointer.put(&put_config, &checkpoint).await?;
                    parent_checkpoint_id = Some(checkpoint_id);
                }
            }

            match next {
                Next::End => {
                    log_graph_complete(config.thread_id.as_deref(), run_start.elapsed().as_millis());
                    return Ok(InvokeOutcome::Completed(current_state));
                }
                Next::Suspend(interrupt) => {
                    let decision = match &self.interrupt_handler {
                        Some(handler) => handler.handle(interrupt.clone()).await,
                        None => Interrupt::Suspend(interrupt.clone()),
                    };
                    match decision {
                        Interrupt::Suspend(interrupt) => {
                            log_graph_complete(
                                config.thread_id.as_deref(),
                                run_start.elapsed().as_millis(),
                            );
                            return Ok(InvokeOutcome::Suspended {
                                state: current_state,
                                interrupt,
                            });
                        }
                        Interrupt::Resume(node_id) => {
                            current_node_id = node_id;
                            continue;
                        }
                    }
                }
                Next::Node(id) => {
                    current_node_id = id;
                    continue;
                }
                Next::Continue => match self.next_map.get(&current_node_id) {
                    Some(NextEntry::Unconditional(next_id)) => {
                        if next_id == super::state_graph::END {
                            log_graph_complete(
                                config.thread_id.as_deref(),
                                run_start.elapsed().as_millis(),
                            );
                            return Ok(InvokeOutcome::Completed(current_state));
                        }
                        current_node_id = next_id.clone();
                    }
                    Some(NextEntry::Conditional(router)) => {
                        let next_id = router.route(&current_state);
                        if next_id == super::state_graph::END {
                            log_graph_complete(
                                config.thread_id.as_deref(),
                                run_start.elapsed().as_millis(),
                            );
                            return Ok(InvokeOutcome::Completed(current_state));
                        }
                        current_node_id = next_id;
                    }
                    None => {
                        log_graph_complete(
                            config.thread_id.as_deref(),
                            run_start.elapsed().as_millis(),
                        );
                        return Ok(InvokeOutcome::Completed(current_state));
                    }
                },
            }
        }
    }

    async fn run_node_with_retry(
        &self,
        node: Arc<dyn Node<S>>,
        node_id: &str,
        state: S,
        run_ctx: &RunContext<S>,
    ) -> Result<(S, Next), OrchestratorError> {
        let mut attempt = 0u32;
        loop {
            let result = self
                .run_node_once(node.clone(), node_id, state.clone(), run_ctx)
                .await;
            match result {
                Ok(pair) => return Ok(pair),
                Err(e) => match self.retry_policy.delay_for_attempt(attempt) {
                    Some(delay) => {
                        attempt += 1;
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
            }
        }
    }

    async fn run_node_once(
        &self,
        node: Arc<dyn Node<S>>,
        node_id: &str,
        state: S,
        run_ctx: &RunContext<S>,
    ) -> Result<(S, Next), OrchestratorError> {
        match &self.middleware {
            None => node.run_with_context(state, run_ctx).await,
            Some(middleware) => {
                let run_ctx = run_ctx.clone();
                let inner: Box<
                    dyn FnOnce(
                            S,
                        ) -> Pin<
                            Box<
                                dyn std::future::Future<Output = Result<(S, Next), OrchestratorError>>
                                    + Send,
                            >,
                        > + Send,
                > = Box::new(move |s: S| {
                    Box::pin(async move { node.run_with_context(s, &run_ctx).await })
                });
                middleware.around_run(node_id, state, inner).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::graph::state_graph::{StateGraph, END, START};
    use crate::memory::MemorySaver;

    use super::*;

    #[derive(Clone, Debug, Default)]
    struct Counter(i32);

    struct Increment;

    #[async_trait]
    impl Node<Counter> for Increment {
        fn id(&self) -> &str {
            "increment"
        }
        async fn run(&self, state: Counter) -> Result<(Counter, Next), OrchestratorError> {
            Ok((Counter(state.0 + 1), Next::Continue))
        }
    }

    struct AlwaysFails(AtomicU32);

    #[async_trait]
    impl Node<Counter> for AlwaysFails {
        fn id(&self) -> &str {
            "flaky"
        }
        async fn run(&self, _state: Counter) -> Result<(Counter, Next), OrchestratorError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(OrchestratorError::Internal("boom".into()))
        }
    }

    struct Suspender;

    #[async_trait]
    impl Node<Counter> for Suspender {
        fn id(&self) -> &str {
            "suspender"
        }
        async fn run(&self, state: Counter) -> Result<(Counter, Next), OrchestratorError> {
            Ok((
                state,
                Next::Suspend(GraphInterrupt::new("suspender", "awaiting approval", serde_json::Value::Null)),
            ))
        }
    }

    #[tokio::test]
    async fn invoke_runs_linear_chain_to_completion() {
        let mut graph = StateGraph::<Counter>::new();
        graph.add_node("inc", Arc::new(Increment));
        graph.add_edge(START, "inc");
        graph.add_edge("inc", END);
        let compiled = graph.compile().unwrap();

        let outcome = compiled
            .invoke(Counter(0), crate::memory::RunnableConfig::default())
            .await
            .unwrap();
        match outcome {
            InvokeOutcome::Completed(state) => assert_eq!(state.0, 1),
            InvokeOutcome::Suspended { .. } => panic!("expected completion"),
        }
    }

    #[tokio::test]
    async fn invoke_persists_checkpoints_when_thread_id_set() {
        let mut graph = StateGraph::<Counter>::new();
        graph.add_node("inc", Arc::new(Increment));
        graph.add_edge(START, "inc");
        graph.add_edge("inc", END);
        let saver: Arc<dyn Checkpointer<Counter>> = Arc::new(MemorySaver::new());
        let compiled = graph.compile_with_checkpointer(saver.clone()).unwrap();

        compiled
            .invoke(Counter(0), crate::memory::RunnableConfig::for_thread("t1"))
            .await
            .unwrap();

        let items = saver
            .list(&crate::memory::RunnableConfig::for_thread("t1"))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn invoke_retries_per_retry_policy_then_fails() {
        let flaky = Arc::new(AlwaysFails(AtomicU32::new(0)));
        let mut graph = StateGraph::<Counter>::new();
        graph.add_node("flaky", flaky.clone() as Arc<dyn Node<Counter>>);
        graph.add_edge(START, "flaky");
        graph.add_edge("flaky", END);
        let graph = graph.with_retry_policy(RetryPolicy::exponential(
            2,
            std::time::Duration::from_millis(1),
            std::time::Duration::from_millis(5),
            2.0,
        ));
        let compiled = graph.compile().unwrap();

        let result = compiled
            .invoke(Counter(0), crate::memory::RunnableConfig::default())
            .await;

        assert!(result.is_err());
        assert_eq!(flaky.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invoke_suspends_on_graph_interrupt() {
        let mut graph = StateGraph::<Counter>::new();
        graph.add_node("suspender", Arc::new(Suspender));
        graph.add_edge(START, "suspender");
        graph.add_edge("suspender", END);
        let compiled = graph.compile().unwrap();

        let outcome = compiled
            .invoke(Counter(0), crate::memory::RunnableConfig::default())
            .await
            .unwrap();
        match outcome {
            InvokeOutcome::Suspended { interrupt, .. } => {
                assert_eq!(interrupt.reason, "awaiting approval");
            }
            InvokeOutcome::Completed(_) => panic!("expected suspension"),
        }
    }
}
