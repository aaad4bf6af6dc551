//! Traits the billing handlers depend on.
//!
//! Storage: `EntitlementRepository` (per-user plan and expiry) and
//! `OrderRepository` (ledger of issued orders). Postgres and in-memory
//! adapters implement both.
//!
//! Events: `EventPublisher` hands events off after a write;
//! `EventSubscriber` and `EventHandler` wire downstream consumers such as the
//! Telegram notifier.

mod entitlement_repository;
mod event_publisher;
mod event_subscriber;
mod order_repository;

pub use entitlement_repository::EntitlementRepository;
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventHandler, EventSubscriber};
pub use order_repository::{OrderRepository, OutcomeWrite};
