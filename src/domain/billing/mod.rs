//! Billing domain module.
//!
//! Payment requests, gateway callbacks, and the entitlements they grant.
//!
//! # Module Structure
//!
//! - `signature` - HMAC signing shared by both gateway directions
//! - `plan` - Plan vocabulary and the fixed plan catalog
//! - `order` - Order references and the order ledger record
//! - `payment_request` - Signed payment request builder
//! - `callback` - Callback parsing, verification and acknowledgment
//! - `entitlement` - Stored entitlement and the expiry gate
//! - `return_origin` - Allow-list for post-payment redirects

mod callback;
mod entitlement;
mod errors;
mod events;
mod order;
mod payment_request;
mod plan;
mod return_origin;
mod signature;

pub use callback::{
    CallbackAcknowledgment, CallbackVerifier, GatewayCallback, TransactionStatus,
    VerifiedCallback, ACCEPT_STATUS,
};
pub use entitlement::{effective_plan, Entitlement, EntitlementView};
pub use errors::BillingError;
pub use events::{BillingEvent, ENTITLEMENT_GRANTED, ORDER_CREATED};
pub use order::{GatewayOutcome, Order, OrderReference, OrderStatus, ParsedReference};
pub use payment_request::{
    BuiltPayment, MerchantProfile, PaymentRequest, PaymentRequestBuilder, PlanSelection,
};
pub use plan::{
    Plan, PlanCatalog, PlanDefinition, PlanId, Recurrence, RecurrenceFrequency,
    FREE_LISTING_LIMIT,
};
pub use return_origin::{ReturnOriginPolicy, POST_PAYMENT_PATH};
pub use signature::SigningKey;
