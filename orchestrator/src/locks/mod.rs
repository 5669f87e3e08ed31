//! Resource Lock Manager (§4.2): named mutual exclusion across processes.

mod error;
mod lock;
mod manager;

pub use error::LockError;
pub use lock::Lock;
pub use manager::{LockHandle, LockManager};
