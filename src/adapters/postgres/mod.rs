//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresEntitlementRepository` - `user_subscriptions` table
//! - `PostgresOrderRepository` - `payment_orders` table

mod entitlement_repository;
mod order_repository;

pub use entitlement_repository::PostgresEntitlementRepository;
pub use order_repository::PostgresOrderRepository;
