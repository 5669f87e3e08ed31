//! Human-in-the-loop interrupts: a node can ask the graph to suspend instead
//! of continuing, e.g. while waiting for an approval decision.

use async_trait::async_trait;
use serde_json::Value;

/// Raised by a node via `Next::Suspend` to request the graph pause.
#[derive(Debug, Clone)]
pub struct GraphInterrupt {
    pub node_id: String,
    pub reason: String,
    pub payload: Value,
}

impl GraphInterrupt {
    pub fn new(node_id: impl Into<String>, reason: impl Into<String>, payload: Value) -> Self {
        Self {
            node_id: node_id.into(),
            reason: reason.into(),
            payload,
        }
    }
}

/// What to do once a node raises a `GraphInterrupt`.
#[derive(Debug, Clone)]
pub enum Interrupt {
    /// Suspend the run; `CompiledStateGraph::invoke` returns `InvokeOutcome::Suspended`.
    Suspend(GraphInterrupt),
    /// Override the interrupt and continue the run with the given node id.
    Resume(String),
}

/// Decides what happens when a node raises a `GraphInterrupt`. Most graphs use
/// `DefaultInterruptHandler`, which always suspends.
#[async_trait]
pub trait InterruptHandler: Send + Sync {
    async fn handle(&self, interrupt: GraphInterrupt) -> Interrupt;
}

/// Always suspends on interrupt; the default when no handler is configured.
pub struct DefaultInterruptHandler;

#[async_trait]
impl InterruptHandler for DefaultInterruptHandler {
    async fn handle(&self, interrupt: GraphInterrupt) -> Interrupt {
        Interrupt::Suspend(interrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_handler_always_suspends() {
        let handler = DefaultInterruptHandler;
        let interrupt = GraphInterrupt::new("approval_gate", "awaiting approval", Value::Null);
        match handler.handle(interrupt).await {
            Interrupt::Suspend(_) => {}
            Interrupt::Resume(_) => panic!("expected suspend"),
        }
    }
}
