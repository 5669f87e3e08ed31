//! Workflow Engine (§4.6/§9): the compiled graph that drives one task from intake to
//! completion -- Supervisor routing, per-specialist tool-call loops, and the Approval Gate
//! suspension point -- built on the graph substrate in `crate::graph`.

mod agents;
mod approval_gate;
mod engine;
mod state;
mod supervisor;

pub use agents::AgentNode;
pub use approval_gate::{gate_path_map, ApprovalGateNode, APPROVAL_GATE_NODE_ID};
pub use engine::{Engine, SpecialistSpec};
pub use state::{WorkflowState, WorkflowStatus};
pub use supervisor::{SpecialistEntry, SupervisorNode};
