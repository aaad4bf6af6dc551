//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    build_payment, get_entitlement, handle_payment_callback, health, payment_return,
    BillingAppState,
};

/// Create the billing API router.
///
/// # Routes
///
/// ## Public Endpoints
/// - `POST /payments` - Build a signed payment request
/// - `GET|POST /payments/return` - Redirect page after payment
///
/// ## Gateway Endpoints (no auth, signature verified)
/// - `POST /payments/callback` - Gateway callback
///
/// ## User Endpoints (require `X-User-Id`)
/// - `GET /entitlement` - Effective plan for the caller
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/payments", post(build_payment))
        .route("/payments/callback", post(handle_payment_callback))
        .route("/payments/return", get(payment_return).post(payment_return))
        .route("/entitlement", get(get_entitlement))
}

/// Create the complete billing router, API routes nested under `/api`.
///
/// # Example
///
/// ```ignore
/// let app = billing_router().with_state(state);
/// ```
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api", billing_routes())
}
