//! Event bus adapters.
//!
//! - `InMemoryEventBus` - Synchronous, in-process bus for testing
//! - `BackgroundEventPublisher` - Bounded queue drained by a worker task
//! - `HandlerRegistry` - Event type routing shared by both

mod background_publisher;
mod in_memory;
mod registry;

pub use background_publisher::{
    BackgroundEventPublisher, BackgroundPublisherConfig, DispatchWorker,
};
pub use in_memory::InMemoryEventBus;
pub use registry::HandlerRegistry;
