//! Inbound gateway callbacks.
//!
//! Callbacks arrive unauthenticated over the public internet. Nothing in a
//! callback is trusted until [`CallbackVerifier::verify`] has checked the
//! merchant identity and the signature, and resolved the order reference
//! against the plan catalog.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{Timestamp, UserId};

use super::errors::BillingError;
use super::order::OrderReference;
use super::plan::{PlanCatalog, PlanDefinition};
use super::signature::SigningKey;

/// Literal status echoed back to the gateway.
pub const ACCEPT_STATUS: &str = "accept";

/// Transaction status reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    InProcessing,
    WaitingAuthComplete,
    Approved,
    Pending,
    Expired,
    Refunded,
    Voided,
    Declined,
    RefundInProcessing,
    Other(String),
}

impl TransactionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "InProcessing" => TransactionStatus::InProcessing,
            "WaitingAuthComplete" => TransactionStatus::WaitingAuthComplete,
            "Approved" => TransactionStatus::Approved,
            "Pending" => TransactionStatus::Pending,
            "Expired" => TransactionStatus::Expired,
            "Refunded" => TransactionStatus::Refunded,
            "Voided" => TransactionStatus::Voided,
            "Declined" => TransactionStatus::Declined,
            "RefundInProcessing" => TransactionStatus::RefundInProcessing,
            other => TransactionStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TransactionStatus::InProcessing => "InProcessing",
            TransactionStatus::WaitingAuthComplete => "WaitingAuthComplete",
            TransactionStatus::Approved => "Approved",
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Expired => "Expired",
            TransactionStatus::Refunded => "Refunded",
            TransactionStatus::Voided => "Voided",
            TransactionStatus::Declined => "Declined",
            TransactionStatus::RefundInProcessing => "RefundInProcessing",
            TransactionStatus::Other(raw) => raw,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, TransactionStatus::Approved)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Callback body in the gateway's native schema.
///
/// Every field is optional at the parsing stage; absence is judged by the
/// verifier so that a partial body still gets a reasoned rejection.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayCallback {
    pub merchant_account: Option<String>,
    pub order_reference: Option<String>,
    pub merchant_signature: Option<String>,
    pub amount: Option<Value>,
    pub currency: Option<String>,
    pub auth_code: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_date: Option<i64>,
    pub processing_date: Option<i64>,
    pub card_pan: Option<String>,
    pub card_type: Option<String>,
    pub transaction_status: Option<String>,
    pub reason: Option<String>,
    pub reason_code: Option<Value>,
    pub payment_system: Option<String>,
}

impl GatewayCallback {
    pub fn from_slice(payload: &[u8]) -> Result<Self, BillingError> {
        serde_json::from_slice(payload)
            .map_err(|e| BillingError::MalformedRequest(format!("callback body: {}", e)))
    }

    /// Reference for acknowledgment purposes, empty when absent.
    pub fn reference_or_empty(&self) -> &str {
        self.order_reference.as_deref().unwrap_or_default()
    }

    pub fn status(&self) -> TransactionStatus {
        TransactionStatus::parse(self.transaction_status.as_deref().unwrap_or_default())
    }

    /// Fields covered by the gateway's callback signature, in order.
    pub fn signature_fields(&self) -> Vec<String> {
        vec![
            text(&self.merchant_account),
            text(&self.order_reference),
            scalar(&self.amount),
            text(&self.currency),
            text(&self.auth_code),
            text(&self.card_pan),
            text(&self.transaction_status),
            scalar(&self.reason_code),
        ]
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn scalar(value: &Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => number_text(n),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Renders a number the way the gateway's signer does (JavaScript
/// `String(n)`): `299.00` signs as `299`, `299.5` as `299.5`.
fn number_text(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f == 0.0 => "0".to_string(),
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Signed reply the gateway expects for every callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackAcknowledgment {
    pub order_reference: String,
    pub status: String,
    pub time: i64,
    pub signature: String,
}

impl CallbackAcknowledgment {
    pub fn signed(order_reference: &str, at: Timestamp, key: &SigningKey) -> Self {
        let time = at.as_unix_secs();
        let time_field = time.to_string();
        let signature = key.sign([order_reference, ACCEPT_STATUS, time_field.as_str()]);
        Self {
            order_reference: order_reference.to_string(),
            status: ACCEPT_STATUS.to_string(),
            time,
            signature,
        }
    }

    pub fn fields(&self) -> [String; 3] {
        [
            self.order_reference.clone(),
            self.status.clone(),
            self.time.to_string(),
        ]
    }
}

/// A callback whose origin and reference have been established.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedCallback {
    pub reference: OrderReference,
    pub user_id: UserId,
    pub plan: PlanDefinition,
    pub status: TransactionStatus,
    pub client_email: Option<String>,
}

/// Authenticates callbacks and resolves them to a plan grant.
#[derive(Debug, Clone)]
pub struct CallbackVerifier {
    merchant_account: String,
    signing_key: SigningKey,
    catalog: Arc<PlanCatalog>,
    require_signature: bool,
}

impl CallbackVerifier {
    pub fn new(
        merchant_account: impl Into<String>,
        signing_key: SigningKey,
        catalog: Arc<PlanCatalog>,
        require_signature: bool,
    ) -> Result<Self, BillingError> {
        let merchant_account = merchant_account.into();
        if merchant_account.trim().is_empty() {
            return Err(BillingError::Configuration(
                "merchant account is not set".to_string(),
            ));
        }
        Ok(Self {
            merchant_account,
            signing_key,
            catalog,
            require_signature,
        })
    }

    /// Checks identity, signature, reference and plan, in that order.
    pub fn verify(&self, callback: &GatewayCallback) -> Result<VerifiedCallback, BillingError> {
        let merchant = callback.merchant_account.as_deref().unwrap_or_default();
        if merchant != self.merchant_account {
            return Err(BillingError::AuthenticationFailure(format!(
                "merchant account mismatch: got '{}'",
                merchant
            )));
        }

        match callback.merchant_signature.as_deref() {
            Some(candidate) => {
                if !self
                    .signing_key
                    .verify(&callback.signature_fields(), candidate)
                {
                    return Err(BillingError::AuthenticationFailure(
                        "callback signature mismatch".to_string(),
                    ));
                }
            }
            None if self.require_signature => {
                return Err(BillingError::AuthenticationFailure(
                    "callback signature missing".to_string(),
                ));
            }
            None => {}
        }

        let raw_reference = callback
            .order_reference
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| BillingError::MalformedRequest("order reference missing".to_string()))?;
        let reference = OrderReference::from_stored(raw_reference);
        let parsed = reference.parse()?;
        let plan = self.catalog.lookup(&parsed.plan_segment)?.clone();

        Ok(VerifiedCallback {
            reference,
            user_id: parsed.user_id,
            plan,
            status: callback.status(),
            client_email: callback.email.clone().filter(|e| !e.is_empty()),
        })
    }

    /// Currency the catalog prices are expressed in.
    pub fn currency(&self) -> &str {
        self.catalog.currency()
    }

    pub fn acknowledge(&self, order_reference: &str, at: Timestamp) -> CallbackAcknowledgment {
        CallbackAcknowledgment::signed(order_reference, at, &self.signing_key)
    }
}
