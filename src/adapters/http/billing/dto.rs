//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! Field names follow the front end's camelCase contract.

use serde::{Deserialize, Serialize};

use crate::domain::billing::{EntitlementView, PaymentRequest};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start a payment for a plan.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildPaymentRequest {
    /// Wire plan id (`10days` or `30days`).
    pub plan_id: String,
    pub user_email: String,
    pub user_id: String,
    /// Origin the buyer should return to, checked against the allow-list.
    #[serde(default)]
    pub return_domain: Option<String>,
}

/// Query string of the return-redirect endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReturnQuery {
    pub rd: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Signed gateway form plus the order it pays for.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildPaymentResponse {
    pub payment_data: PaymentRequest,
    pub order_id: String,
    pub is_recurring: bool,
}

/// Entitlement as seen by the client, after the expiry gate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementResponse {
    pub user_id: String,
    pub plan: String,
    pub stored_plan: String,
    /// RFC 3339, absent for users who never paid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    pub days_remaining: i64,
    pub has_paid_access: bool,
    pub can_save_listings: bool,
    pub has_bot_access: bool,
    /// `null` when unlimited.
    pub listing_limit: Option<usize>,
}

impl From<EntitlementView> for EntitlementResponse {
    fn from(view: EntitlementView) -> Self {
        Self {
            user_id: view.user_id.to_string(),
            plan: view.effective_plan.as_str().to_string(),
            stored_plan: view.stored_plan.as_str().to_string(),
            expires_at: view.expires_at.map(|t| t.as_datetime().to_rfc3339()),
            days_remaining: view.days_remaining,
            has_paid_access: view.has_paid_access,
            can_save_listings: view.effective_plan.can_save_listings(),
            has_bot_access: view.effective_plan.has_bot_access(),
            listing_limit: view.listing_limit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
