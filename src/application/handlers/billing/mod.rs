//! Billing handlers.
//!
//! ## Commands
//! - Building signed payment requests
//! - Reconciling gateway callbacks into entitlements
//!
//! ## Queries
//! - Get a user's effective entitlement

mod build_payment;
mod get_entitlement;
mod handle_payment_callback;

// Commands
pub use build_payment::{BuildPaymentCommand, BuildPaymentHandler, BuildPaymentResult};
pub use handle_payment_callback::{
    CallbackOutcome, HandlePaymentCallbackCommand, HandlePaymentCallbackHandler,
    HandlePaymentCallbackResult,
};

// Queries
pub use get_entitlement::{GetEntitlementHandler, GetEntitlementQuery, GetEntitlementResult};
