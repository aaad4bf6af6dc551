//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers (payment issue, callback reconciliation) write; the
//! entitlement query only reads.

pub mod handlers;

pub use handlers::{
    BuildPaymentCommand, BuildPaymentHandler, BuildPaymentResult, CallbackOutcome,
    GetEntitlementHandler, GetEntitlementQuery, GetEntitlementResult,
    HandlePaymentCallbackCommand, HandlePaymentCallbackHandler, HandlePaymentCallbackResult,
};
