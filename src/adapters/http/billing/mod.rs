//! HTTP adapter for billing endpoints.
//!
//! Exposes the billing domain via REST API:
//! - `POST /api/payments` - Build a signed payment request
//! - `POST /api/payments/callback` - Gateway callback (signature verified)
//! - `GET|POST /api/payments/return` - Post-payment redirect page
//! - `GET /api/entitlement` - Current user's effective plan
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{AuthenticatedUser, BillingApiError, BillingAppState};
pub use routes::{billing_router, billing_routes};
