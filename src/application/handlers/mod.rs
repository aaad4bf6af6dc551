//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod billing;

pub use billing::{
    BuildPaymentCommand, BuildPaymentHandler, BuildPaymentResult, CallbackOutcome,
    GetEntitlementHandler, GetEntitlementQuery, GetEntitlementResult,
    HandlePaymentCallbackCommand, HandlePaymentCallbackHandler, HandlePaymentCallbackResult,
};
