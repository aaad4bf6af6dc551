//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, events)
//! - `billing` - Plans, payment requests, callbacks and entitlements

pub mod billing;
pub mod foundation;
