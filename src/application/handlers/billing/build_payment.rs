//! BuildPaymentHandler - Command handler issuing signed payment requests.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, BillingEvent, PaymentRequest, PaymentRequestBuilder, PlanSelection,
};
use crate::domain::foundation::{EventEnvelope, Timestamp};
use crate::ports::{EventPublisher, OrderRepository};

/// Command to start a payment for a plan.
#[derive(Debug, Clone)]
pub struct BuildPaymentCommand {
    pub plan_id: String,
    pub user_id: String,
    pub user_email: String,
    pub return_domain: Option<String>,
    pub requested_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct BuildPaymentResult {
    pub payment_request: PaymentRequest,
    pub order_reference: String,
    pub is_recurring: bool,
}

/// Builds the signed request, records the order, then announces it.
///
/// Nothing is recorded for invalid selections; the gateway is never
/// involved in rejecting them.
pub struct BuildPaymentHandler {
    builder: Arc<PaymentRequestBuilder>,
    orders: Arc<dyn OrderRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl BuildPaymentHandler {
    pub fn new(
        builder: Arc<PaymentRequestBuilder>,
        orders: Arc<dyn OrderRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            builder,
            orders,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: BuildPaymentCommand) -> Result<BuildPaymentResult, BillingError> {
        let selection = PlanSelection {
            plan_id: cmd.plan_id,
            user_id: cmd.user_id,
            user_email: cmd.user_email,
            return_domain: cmd.return_domain,
        };

        let built = self
            .builder
            .build(&selection, cmd.requested_at)
            .map_err(|e| {
                tracing::warn!(
                    plan_id = %selection.plan_id,
                    user_id = %selection.user_id,
                    error = %e,
                    "payment request rejected"
                );
                e
            })?;

        self.orders.save(&built.order).await.map_err(|e| {
            tracing::error!(
                order_reference = %built.order.reference,
                error = %e,
                "failed to record order"
            );
            BillingError::Storage(e.to_string())
        })?;

        tracing::info!(
            order_reference = %built.order.reference,
            user_id = %built.order.user_id,
            plan_id = %built.order.plan_id,
            amount = built.order.amount,
            recurring = built.request.is_recurring(),
            "payment request issued"
        );

        let event = BillingEvent::OrderCreated {
            order_reference: built.order.reference.clone(),
            user_id: built.order.user_id.clone(),
            plan_id: built.order.plan_id,
            amount: built.order.amount,
            currency: built.order.currency.clone(),
            occurred_at: cmd.requested_at,
        };
        publish_best_effort(self.event_publisher.as_ref(), &event).await;

        Ok(BuildPaymentResult {
            order_reference: built.order.reference.to_string(),
            is_recurring: built.request.is_recurring(),
            payment_request: built.request,
        })
    }
}

/// Publishes an event, logging instead of failing when delivery is refused.
pub(crate) async fn publish_best_effort(publisher: &dyn EventPublisher, event: &BillingEvent) {
    let envelope = match EventEnvelope::from_event(event) {
        Ok(envelope) => envelope
            .with_correlation_id(event.order_reference().as_str())
            .with_user_id(event.user_id().as_str()),
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize billing event");
            return;
        }
    };
    let event_type = envelope.event_type.clone();

    if let Err(e) = publisher.publish(envelope).await {
        let err = BillingError::from(e);
        tracing::warn!(
            event_type = %event_type,
            order_reference = %event.order_reference(),
            error = %err,
            "downstream notification failed"
        );
    }
}
