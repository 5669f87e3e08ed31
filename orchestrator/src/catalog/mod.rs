//! Tool Catalog & Progressive Loader (§4.4): tool metadata plus a strategy-driven selector
//! that returns a minimal relevant subset of tools for a given task and agent.

mod error;
mod manager;
mod tool;

pub use error::CatalogError;
pub use manager::ToolCatalog;
pub use tool::{AgentProfile, Tool};
