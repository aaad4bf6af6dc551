//! GoToHome Billing - Subscription entitlements and payment reconciliation
//!
//! This crate builds signed WayForPay payment requests, verifies the
//! gateway's asynchronous callbacks, and keeps each user's plan and expiry
//! in step with verified payment outcomes only.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
