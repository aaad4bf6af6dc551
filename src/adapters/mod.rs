//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `events` - In-memory and background event delivery
//! - `http` - Axum HTTP surface
//! - `memory` - In-memory repositories for tests and local runs
//! - `postgres` - PostgreSQL repositories
//! - `telegram` - Sales channel notices

pub mod events;
pub(crate) mod html;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod telegram;

pub use events::{
    BackgroundEventPublisher, BackgroundPublisherConfig, DispatchWorker, HandlerRegistry,
    InMemoryEventBus,
};
pub use memory::{InMemoryEntitlementRepository, InMemoryOrderRepository};
pub use postgres::{PostgresEntitlementRepository, PostgresOrderRepository};
pub use telegram::{TelegramConfig, TelegramNotifier};
