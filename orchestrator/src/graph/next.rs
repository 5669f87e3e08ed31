//! `Next`: a node's routing decision after it runs.

use super::interrupt::GraphInterrupt;

/// What the compiled graph should do after a node finishes.
#[derive(Debug, Clone)]
pub enum Next {
    /// Follow the statically-compiled edge order (the common case).
    Continue,
    /// Jump directly to the named node, bypassing the compiled edge order.
    Node(String),
    /// Stop the run; the current state is the final state.
    End,
    /// Suspend the run (e.g. awaiting human approval); the graph persists a
    /// checkpoint and returns `InvokeOutcome::Suspended` instead of completing.
    Suspend(GraphInterrupt),
}
