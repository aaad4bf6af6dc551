//! Billing domain events.
//!
//! Published after the state change they describe has been stored. Consumers
//! (channel notices, analytics) must tolerate duplicates: a redelivered
//! approval produces a second `EntitlementGranted`.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainEvent, Timestamp, UserId};

use super::order::OrderReference;
use super::plan::{Plan, PlanId};

pub const ORDER_CREATED: &str = "order.created.v1";
pub const ENTITLEMENT_GRANTED: &str = "subscription.entitlement_granted.v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BillingEvent {
    /// A signed payment request was issued.
    OrderCreated {
        order_reference: OrderReference,
        user_id: UserId,
        plan_id: PlanId,
        amount: u32,
        currency: String,
        occurred_at: Timestamp,
    },

    /// A verified approval was applied to the entitlement store.
    EntitlementGranted {
        order_reference: OrderReference,
        user_id: UserId,
        plan_id: PlanId,
        plan: Plan,
        product_name: String,
        price: u32,
        currency: String,
        duration_days: u32,
        recurring: bool,
        client_email: Option<String>,
        expires_at: Timestamp,
        occurred_at: Timestamp,
    },
}

impl BillingEvent {
    pub fn user_id(&self) -> &UserId {
        match self {
            BillingEvent::OrderCreated { user_id, .. }
            | BillingEvent::EntitlementGranted { user_id, .. } => user_id,
        }
    }

    pub fn order_reference(&self) -> &OrderReference {
        match self {
            BillingEvent::OrderCreated {
                order_reference, ..
            }
            | BillingEvent::EntitlementGranted {
                order_reference, ..
            } => order_reference,
        }
    }
}

impl DomainEvent for BillingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BillingEvent::OrderCreated { .. } => ORDER_CREATED,
            BillingEvent::EntitlementGranted { .. } => ENTITLEMENT_GRANTED,
        }
    }

    fn aggregate_id(&self) -> String {
        match self {
            BillingEvent::OrderCreated {
                order_reference, ..
            } => order_reference.to_string(),
            BillingEvent::EntitlementGranted { user_id, .. } => user_id.to_string(),
        }
    }

    fn aggregate_type(&self) -> &'static str {
        match self {
            BillingEvent::OrderCreated { .. } => "Order",
            BillingEvent::EntitlementGranted { .. } => "Entitlement",
        }
    }

    fn occurred_at(&self) -> Timestamp {
        match self {
            BillingEvent::OrderCreated { occurred_at, .. }
            | BillingEvent::EntitlementGranted { occurred_at, .. } => *occurred_at,
        }
    }
}
