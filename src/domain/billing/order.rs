//! Orders and their wire reference.
//!
//! An order reference has the shape `order_{userId}_{planId}_{unixMillis}`.
//! The reference alone is enough to reconcile a callback, so the gateway
//! never has to echo anything else back. The persisted [`Order`] adds a status
//! for auditing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId, ValidationError};

use super::plan::PlanId;
use super::callback::TransactionStatus;

/// Leading segment of every reference.
pub const ORDER_REFERENCE_PREFIX: &str = "order";

/// Segment separator inside a reference.
pub const ORDER_REFERENCE_DELIMITER: char = '_';

/// Self-describing identifier of one payment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderReference(String);

impl OrderReference {
    /// Builds a fresh reference for the user and plan.
    ///
    /// The user id must not contain the delimiter, otherwise the reference
    /// could not be split back into its parts.
    pub fn generate(
        user_id: &UserId,
        plan_id: PlanId,
        created_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        if user_id.as_str().contains(ORDER_REFERENCE_DELIMITER) {
            return Err(ValidationError::invalid_format(
                "user_id",
                format!("must not contain '{}'", ORDER_REFERENCE_DELIMITER),
            ));
        }
        Ok(Self(format!(
            "{prefix}{d}{user}{d}{plan}{d}{millis}",
            prefix = ORDER_REFERENCE_PREFIX,
            d = ORDER_REFERENCE_DELIMITER,
            user = user_id,
            plan = plan_id,
            millis = created_at.as_unix_millis(),
        )))
    }

    /// Wraps a stored reference without inspecting it.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Splits the reference into the user and raw plan segment.
    ///
    /// Requires at least four segments. The plan segment is returned raw; it
    /// is resolved against the plan catalog separately.
    pub fn parse(&self) -> Result<ParsedReference, ValidationError> {
        let parts: Vec<&str> = self.0.split(ORDER_REFERENCE_DELIMITER).collect();
        if parts.len() < 4 {
            return Err(ValidationError::invalid_format(
                "order_reference",
                format!("expected at least 4 segments, found {}", parts.len()),
            ));
        }
        let user_id = UserId::new(parts[1])?;
        if parts[2].is_empty() {
            return Err(ValidationError::empty_field("plan_id"));
        }
        Ok(ParsedReference {
            user_id,
            plan_segment: parts[2].to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parts extracted from an order reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference {
    pub user_id: UserId,
    pub plan_segment: String,
}

/// Ledger status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Pending,
    Approved,
    Declined,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::Declined => "declined",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Whether an entry in this status may move to `next`.
    ///
    /// An approved order never falls back to pending or declined; refunds
    /// always apply. Storage adapters enforce the same rule in their write.
    pub fn accepts(&self, next: OrderStatus) -> bool {
        !(*self == OrderStatus::Approved && next.is_pre_approval())
    }

    /// Statuses an approved order may not be overwritten with.
    pub fn is_pre_approval(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Declined)
    }

    /// Ledger status implied by a gateway transaction status.
    pub fn from_transaction(status: &TransactionStatus) -> Self {
        match status {
            TransactionStatus::Approved => OrderStatus::Approved,
            TransactionStatus::Refunded => OrderStatus::Refunded,
            TransactionStatus::Declined
            | TransactionStatus::Expired
            | TransactionStatus::Voided => OrderStatus::Declined,
            TransactionStatus::InProcessing
            | TransactionStatus::WaitingAuthComplete
            | TransactionStatus::Pending
            | TransactionStatus::RefundInProcessing
            | TransactionStatus::Other(_) => OrderStatus::Pending,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(OrderStatus::Created),
            "pending" => Ok(OrderStatus::Pending),
            "approved" => Ok(OrderStatus::Approved),
            "declined" => Ok(OrderStatus::Declined),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(ValidationError::unknown_value("order_status", other)),
        }
    }
}

/// One payment attempt, as recorded in the order ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub reference: OrderReference,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub amount: u32,
    pub currency: String,
    pub status: OrderStatus,
    /// Raw status string of the last gateway callback applied.
    pub gateway_status: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    pub fn new(
        reference: OrderReference,
        user_id: UserId,
        plan_id: PlanId,
        amount: u32,
        currency: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            reference,
            user_id,
            plan_id,
            amount,
            currency: currency.into(),
            status: OrderStatus::Created,
            gateway_status: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// Applies an authenticated gateway outcome.
    ///
    /// Returns false when the outcome is stale (see [`OrderStatus::accepts`]).
    pub fn record_gateway_outcome(&mut self, outcome: &GatewayOutcome) -> bool {
        if !self.status.accepts(outcome.status) {
            return false;
        }
        self.status = outcome.status;
        self.gateway_status = Some(outcome.gateway_status.clone());
        self.updated_at = outcome.at;
        true
    }
}

/// Result of one authenticated callback, as written to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOutcome {
    pub status: OrderStatus,
    /// Raw gateway status string.
    pub gateway_status: String,
    pub at: Timestamp,
}

impl GatewayOutcome {
    pub fn new(status: &TransactionStatus, at: Timestamp) -> Self {
        Self {
            status: OrderStatus::from_transaction(status),
            gateway_status: status.as_str().to_string(),
            at,
        }
    }
}
