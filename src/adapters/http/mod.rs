//! HTTP adapters - REST API implementations.

pub mod app;
pub mod billing;

pub use app::{app_router, HttpSettings};
pub use billing::{billing_router, BillingAppState};
