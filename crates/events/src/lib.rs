//! Change-notification plumbing shared by the store and identity adapters.

pub mod bus;
pub mod in_memory_bus;
pub mod watch;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use watch::{WatchHandle, WatchRegistry};
