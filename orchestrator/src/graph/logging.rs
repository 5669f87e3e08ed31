//! Structured `tracing` hooks for graph execution, used by `CompiledStateGraph::invoke`
//! and `LoggingNodeMiddleware`.

use tracing::{error, info};

pub fn log_graph_start(thread_id: Option<&str>, first_node_id: &str) {
    info!(thread_id, first_node_id, "graph run starting");
}

pub fn log_node_start(node_id: &str) {
    info!(node_id, "node starting");
}

pub fn log_node_complete(node_id: &str, elapsed_ms: u128) {
    info!(node_id, elapsed_ms, "node completed");
}

pub fn log_state_update(node_id: &str) {
    info!(node_id, "state updated");
}

pub fn log_graph_error(node_id: &str, error: &str) {
    error!(node_id, error, "graph run failed");
}

pub fn log_graph_complete(thread_id: Option<&str>, elapsed_ms: u128) {
    info!(thread_id, elapsed_ms, "graph run completed");
}
