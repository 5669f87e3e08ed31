//! `NodeMiddleware` that logs node start/completion/error via `tracing`.

use async_trait::async_trait;
use std::fmt::Debug;
use std::pin::Pin;
use std::time::Instant;

use crate::error::OrchestratorError;

use super::logging::{log_graph_error, log_node_complete, log_node_start};
use super::node_middleware::NodeMiddleware;
use super::Next;

/// Wraps every node execution with start/complete/error log lines. Compose with
/// other middleware by nesting `around_run` calls if both are needed.
pub struct LoggingNodeMiddleware;

#[async_trait]
impl<S> NodeMiddleware<S> for LoggingNodeMiddleware
where
    S: Clone + Send + Sync + Debug + 'static,
{
    async fn around_run(
        &self,
        node_id: &str,
        state: S,
        inner: Box<
            dyn FnOnce(
                    S,
                ) -> Pin<
                    Box<
                        dyn std::future::Future<Output = Result<(S, Next), OrchestratorError>>
                            + Send,
                    >,
                > + Send,
        >,
    ) -> Result<(S, Next), OrchestratorError> {
        log_node_start(node_id);
        let start = Instant::now();
        let result = inner(state).await;
        match &result {
            Ok(_) => log_node_complete(node_id, start.elapsed().as_millis()),
            Err(e) => log_graph_error(node_id, &e.to_string()),
        }
        result
    }
}
