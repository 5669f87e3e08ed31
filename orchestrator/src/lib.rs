//! # Orchestrator
//!
//! A multi-agent development-automation orchestration engine: a compiled state graph
//! drives a task from intake through specialist execution to completion, suspending at a
//! risk-scored Human-In-The-Loop approval gate when a specialist's action would mutate
//! external state.
//!
//! ## Design principles
//!
//! - **One state type per run**: a [`workflow::WorkflowState`] flows through every node of
//!   the compiled graph -- no separate input/output types.
//! - **Suspend, don't block**: a node that needs human approval returns [`graph::Next::Suspend`]
//!   with a [`graph::GraphInterrupt`]; the run returns immediately and resumes later from a
//!   checkpoint once a decision lands.
//! - **Progressive tool disclosure**: the [`catalog::ToolCatalog`] hands each specialist the
//!   smallest relevant slice of its tool surface instead of the whole catalog.
//! - **Everything is an event**: task lifecycle, lock, and approval transitions are published
//!   on the [`bus::EventBus`] so other subsystems (and this crate's own approval-resume path)
//!   can react without polling.
//!
//! ## Main modules
//!
//! - [`graph`]: [`graph::StateGraph`], [`graph::CompiledStateGraph`], [`graph::Node`],
//!   [`graph::Next`], [`graph::GraphInterrupt`] -- the generic compiled-graph substrate.
//! - [`workflow`]: [`workflow::Engine`], [`workflow::SupervisorNode`], [`workflow::AgentNode`],
//!   [`workflow::ApprovalGateNode`] -- the concrete workflow built on that substrate.
//! - [`catalog`]: [`catalog::ToolCatalog`], [`catalog::Tool`], [`catalog::AgentProfile`] --
//!   tool metadata and strategy-driven selection.
//! - [`hitl`]: [`hitl::HitlManager`], [`hitl::RiskRule`], [`hitl::ApprovalRequest`] --
//!   risk assessment and the approval request lifecycle.
//! - [`locks`]: [`locks::LockManager`], [`locks::LockHandle`] -- distributed resource locking.
//! - [`bus`]: [`bus::EventBus`], [`bus::Event`], [`bus::EventHandler`] -- the async event bus.
//! - [`memory`]: [`memory::Checkpointer`], [`memory::MemorySaver`], [`memory::SqliteSaver`],
//!   [`memory::RunnableConfig`] -- checkpoint persistence.
//! - [`llm`]: [`llm::LlmClient`] trait, [`llm::MockLlm`], [`llm::ChatOpenAI`].
//! - [`tool_gateway`]: [`tool_gateway::ToolGatewayClient`] -- outbound tool execution.
//! - [`task`]: [`task::Task`], [`task::Priority`].
//! - [`message`]: [`message::Message`], [`message::ToolCallRequest`].
//! - [`config`]: [`config::Settings`] -- process-wide configuration.
//! - [`error`]: [`error::OrchestratorError`], [`error::ErrorKind`].
//!
//! Key types are re-exported at crate root.

pub mod bus;
pub mod catalog;
pub mod config;
pub mod error;
pub mod graph;
pub mod hitl;
pub mod llm;
pub mod locks;
pub mod memory;
pub mod message;
pub mod task;
pub mod tool_gateway;
pub mod workflow;

pub use bus::{Event, EventBus, EventHandler, RemoteMessage};
pub use catalog::{AgentProfile, CatalogError, Tool, ToolCatalog};
pub use config::{ConfigError, Settings, ToolStrategy};
pub use error::{ErrorKind, OrchestratorError};
pub use graph::{
    CompilationError, CompiledStateGraph, DefaultInterruptHandler, GraphInterrupt, Interrupt,
    InterruptHandler, InvokeOutcome, Next, Node, RetryPolicy, RunContext, StateGraph, END, START,
};
pub use hitl::{ApprovalRequest, ApprovalStatus, Decision, HitlError, HitlManager, RiskLevel, RiskRule, Role};
pub use llm::{ChatOpenAI, LlmClient, LlmRequest, LlmResponse, LlmUsage, MockLlm};
pub use locks::{Lock, LockError, LockHandle, LockManager};
pub use memory::{Checkpoint, CheckpointError, Checkpointer, MemorySaver, RunnableConfig, SqliteSaver};
pub use message::{Message, ToolCallRequest};
pub use task::{Priority, Task};
pub use tool_gateway::ToolGatewayClient;
pub use workflow::{
    AgentNode, ApprovalGateNode, Engine, SpecialistEntry, SpecialistSpec, SupervisorNode,
    WorkflowState, WorkflowStatus, APPROVAL_GATE_NODE_ID,
};
