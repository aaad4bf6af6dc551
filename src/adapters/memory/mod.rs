//! In-memory repository adapters for tests and database-less runs.

mod entitlement_repository;
mod order_repository;

pub use entitlement_repository::InMemoryEntitlementRepository;
pub use order_repository::InMemoryOrderRepository;
