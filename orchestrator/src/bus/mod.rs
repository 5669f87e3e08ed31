//! Event Bus (§4.1): async publish/subscribe between the Supervisor, specialist agents,
//! the Lock Manager, and the HITL Manager, with optional fan-out to other nodes.

mod error;
mod event;
mod memory_bus;
mod remote;

pub use error::BusError;
pub use event::{event_types, Event, RemoteMessage};
pub use memory_bus::{EventBus, EventHandler, FnHandler, SubscriptionId};
pub use remote::{BroadcastRemoteChannel, RemoteChannel};
