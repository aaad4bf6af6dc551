//! HandlePaymentCallbackHandler - Reconciles gateway callbacks into entitlements.
//!
//! Every delivery ends in one of three ways:
//! - a verified approval upserts the user's entitlement
//! - a verified non-approval changes nothing but the order ledger
//! - anything unverifiable is rejected without touching storage
//!
//! All three are answered with a signed acknowledgment. Only a storage
//! failure escapes as an error, so that the gateway redelivers.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, BillingEvent, CallbackAcknowledgment, CallbackVerifier, Entitlement,
    GatewayCallback, GatewayOutcome, Plan, VerifiedCallback,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{EntitlementRepository, EventPublisher, OrderRepository, OutcomeWrite};

use super::build_payment::publish_best_effort;

/// Command carrying one raw callback delivery.
#[derive(Debug, Clone)]
pub struct HandlePaymentCallbackCommand {
    pub payload: Vec<u8>,
    pub received_at: Timestamp,
}

/// What the delivery did to local state.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    EntitlementApplied {
        user_id: UserId,
        plan: Plan,
        expires_at: Timestamp,
    },
    NoChange {
        transaction_status: String,
    },
    Rejected {
        reason: BillingError,
    },
}

#[derive(Debug, Clone)]
pub struct HandlePaymentCallbackResult {
    pub acknowledgment: CallbackAcknowledgment,
    pub outcome: CallbackOutcome,
}

pub struct HandlePaymentCallbackHandler {
    verifier: Arc<CallbackVerifier>,
    entitlements: Arc<dyn EntitlementRepository>,
    orders: Arc<dyn OrderRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl HandlePaymentCallbackHandler {
    pub fn new(
        verifier: Arc<CallbackVerifier>,
        entitlements: Arc<dyn EntitlementRepository>,
        orders: Arc<dyn OrderRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            verifier,
            entitlements,
            orders,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentCallbackCommand,
    ) -> Result<HandlePaymentCallbackResult, BillingError> {
        let at = cmd.received_at;

        // 1. Parse
        let callback = match GatewayCallback::from_slice(&cmd.payload) {
            Ok(callback) => callback,
            Err(e) => return Ok(self.reject("", e, at)),
        };
        let reference = callback.reference_or_empty().to_string();

        tracing::info!(
            order_reference = %reference,
            transaction_status = callback.transaction_status.as_deref().unwrap_or_default(),
            "payment callback received"
        );

        // 2. Authenticate and resolve the reference
        let verified = match self.verifier.verify(&callback) {
            Ok(verified) => verified,
            Err(e) => return Ok(self.reject(&reference, e, at)),
        };

        // 3. Apply
        let outcome = if verified.status.is_approved() {
            let entitlement = Entitlement::granted(verified.user_id.clone(), &verified.plan, at);
            self.entitlements.upsert(&entitlement).await.map_err(|e| {
                tracing::error!(
                    order_reference = %reference,
                    user_id = %verified.user_id,
                    error = %e,
                    "failed to store entitlement"
                );
                BillingError::Storage(e.to_string())
            })?;

            let expires_at = entitlement.expires_at.unwrap_or(at);
            tracing::info!(
                order_reference = %reference,
                user_id = %verified.user_id,
                plan = %entitlement.plan,
                expires_at = %expires_at.as_datetime(),
                "entitlement applied"
            );
            CallbackOutcome::EntitlementApplied {
                user_id: verified.user_id.clone(),
                plan: entitlement.plan,
                expires_at,
            }
        } else {
            tracing::info!(
                order_reference = %reference,
                transaction_status = %verified.status,
                "non-approved status, entitlement unchanged"
            );
            CallbackOutcome::NoChange {
                transaction_status: verified.status.to_string(),
            }
        };

        // 4. Ledger
        self.record_in_ledger(&verified, at).await?;

        // 5. Notify
        if let CallbackOutcome::EntitlementApplied { expires_at, .. } = &outcome {
            let event = granted_event(&verified, self.verifier.currency(), *expires_at, at);
            publish_best_effort(self.event_publisher.as_ref(), &event).await;
        }

        Ok(HandlePaymentCallbackResult {
            acknowledgment: self.verifier.acknowledge(&reference, at),
            outcome,
        })
    }

    async fn record_in_ledger(
        &self,
        verified: &VerifiedCallback,
        at: Timestamp,
    ) -> Result<(), BillingError> {
        let storage_error = |e: crate::domain::foundation::DomainError| {
            tracing::error!(
                order_reference = %verified.reference,
                error = %e,
                "failed to update order ledger"
            );
            BillingError::Storage(e.to_string())
        };

        let outcome = GatewayOutcome::new(&verified.status, at);
        let write = self
            .orders
            .record_outcome(&verified.reference, &outcome)
            .await
            .map_err(storage_error)?;

        match write {
            OutcomeWrite::Applied => {}
            OutcomeWrite::Stale => tracing::debug!(
                order_reference = %verified.reference,
                transaction_status = %verified.status,
                "stale gateway status ignored by ledger"
            ),
            OutcomeWrite::Missing => tracing::debug!(
                order_reference = %verified.reference,
                "no ledger entry for order"
            ),
        }
        Ok(())
    }

    fn reject(
        &self,
        reference: &str,
        reason: BillingError,
        at: Timestamp,
    ) -> HandlePaymentCallbackResult {
        match &reason {
            BillingError::AuthenticationFailure(_) => tracing::error!(
                alert = "payment_fraud_signal",
                order_reference = %reference,
                error = %reason,
                "payment callback failed authentication"
            ),
            _ => tracing::warn!(
                order_reference = %reference,
                error = %reason,
                "payment callback rejected"
            ),
        }

        HandlePaymentCallbackResult {
            acknowledgment: self.verifier.acknowledge(reference, at),
            outcome: CallbackOutcome::Rejected { reason },
        }
    }
}

fn granted_event(
    verified: &VerifiedCallback,
    currency: &str,
    expires_at: Timestamp,
    at: Timestamp,
) -> BillingEvent {
    BillingEvent::EntitlementGranted {
        order_reference: verified.reference.clone(),
        user_id: verified.user_id.clone(),
        plan_id: verified.plan.id,
        plan: verified.plan.plan,
        product_name: verified.plan.product_name.clone(),
        price: verified.plan.price,
        currency: currency.to_string(),
        duration_days: verified.plan.duration_days,
        recurring: verified.plan.is_recurring(),
        client_email: verified.client_email.clone(),
        expires_at,
        occurred_at: at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::{InMemoryEntitlementRepository, InMemoryOrderRepository};
    use crate::application::handlers::billing::test_support::{
        callback_verifier, capture_events, catalog, failing_publisher, signed_callback_body,
        MERCHANT, SECRET,
    };
    use crate::domain::billing::{
        Order, OrderReference, OrderStatus, PlanId, SigningKey, ENTITLEMENT_GRANTED,
    };
    use crate::domain::foundation::DomainError;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Barrier;

    struct Fixture {
        entitlements: InMemoryEntitlementRepository,
        orders: InMemoryOrderRepository,
        bus: Arc<InMemoryEventBus>,
        handler: HandlePaymentCallbackHandler,
    }

    fn fixture() -> Fixture {
        let entitlements = InMemoryEntitlementRepository::new();
        let orders = InMemoryOrderRepository::new();
        let bus = Arc::new(InMemoryEventBus::new());
        let handler = HandlePaymentCallbackHandler::new(
            Arc::new(callback_verifier(true)),
            Arc::new(entitlements.clone()),
            Arc::new(orders.clone()),
            bus.clone(),
        );
        Fixture {
            entitlements,
            orders,
            bus,
            handler,
        }
    }

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    fn command(body: Vec<u8>, received_at: Timestamp) -> HandlePaymentCallbackCommand {
        HandlePaymentCallbackCommand {
            payload: body,
            received_at,
        }
    }

    fn user() -> UserId {
        UserId::new("u123").unwrap()
    }

    const REFERENCE: &str = "order_u123_30days_1700000000000";

    // ════════════════════════════════════════════════════════════════════════════
    // Approval
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn approval_grants_long_plan_for_thirty_days() {
        let f = fixture();
        let now = at(1_700_000_100);
        let result = f
            .handler
            .handle(command(signed_callback_body(REFERENCE, "Approved", MERCHANT), now))
            .await
            .unwrap();

        assert_eq!(
            result.outcome,
            CallbackOutcome::EntitlementApplied {
                user_id: user(),
                plan: Plan::TierLong,
                expires_at: now.add_days(30),
            }
        );
        let row = f.entitlements.find_by_user_id(&user()).await.unwrap().unwrap();
        assert_eq!(row.plan, Plan::TierLong);
        assert_eq!(row.expires_at, Some(now.add_days(30)));

        let granted = f.bus.events_of_type(ENTITLEMENT_GRANTED);
        assert_eq!(granted.len(), 1);
        match granted[0].payload_as::<BillingEvent>().unwrap() {
            BillingEvent::EntitlementGranted {
                currency, expires_at, ..
            } => {
                assert_eq!(currency, "UAH");
                assert_eq!(expires_at, now.add_days(30));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn acknowledgment_is_signed() {
        let f = fixture();
        let result = f
            .handler
            .handle(command(
                signed_callback_body(REFERENCE, "Approved", MERCHANT),
                at(1_700_000_100),
            ))
            .await
            .unwrap();

        let ack = result.acknowledgment;
        assert_eq!(ack.order_reference, REFERENCE);
        assert_eq!(ack.status, "accept");
        assert_eq!(ack.time, 1_700_000_100);
        let key = SigningKey::new(SECRET).unwrap();
        assert!(key.verify(&ack.fields(), &ack.signature));
    }

    #[tokio::test]
    async fn duplicate_delivery_yields_same_row() {
        let f = fixture();
        let now = at(1_700_000_100);
        let body = signed_callback_body(REFERENCE, "Approved", MERCHANT);

        f.handler.handle(command(body.clone(), now)).await.unwrap();
        let once = f.entitlements.find_by_user_id(&user()).await.unwrap();
        f.handler.handle(command(body, now)).await.unwrap();
        let twice = f.entitlements.find_by_user_id(&user()).await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(f.entitlements.len().await, 1);
    }

    #[tokio::test]
    async fn redelivery_resets_expiry_from_new_receipt_time() {
        let f = fixture();
        let first = at(1_700_000_100);
        let second = first.add_hours(1);
        let body = signed_callback_body(REFERENCE, "Approved", MERCHANT);

        f.handler.handle(command(body.clone(), first)).await.unwrap();
        f.handler.handle(command(body, second)).await.unwrap();

        let row = f.entitlements.find_by_user_id(&user()).await.unwrap().unwrap();
        assert_eq!(row.expires_at, Some(second.add_days(30)));
    }

    #[tokio::test]
    async fn approval_marks_ledger_order_approved() {
        let f = fixture();
        let created = at(1_700_000_000);
        let reference = OrderReference::from_stored(REFERENCE);
        f.orders
            .save(&Order::new(reference.clone(), user(), PlanId::ThirtyDays, 299, "UAH", created))
            .await
            .unwrap();

        f.handler
            .handle(command(
                signed_callback_body(REFERENCE, "Approved", MERCHANT),
                at(1_700_000_100),
            ))
            .await
            .unwrap();

        let order = f.orders.find_by_reference(&reference).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Approved);
        assert_eq!(order.gateway_status.as_deref(), Some("Approved"));
    }

    /// Holds both callbacks at the ledger write, then lets declines land last.
    struct DeclineLandsLast {
        inner: InMemoryOrderRepository,
        both_arrived: Barrier,
    }

    #[async_trait]
    impl OrderRepository for DeclineLandsLast {
        async fn save(&self, order: &Order) -> Result<(), DomainError> {
            self.inner.save(order).await
        }

        async fn record_outcome(
            &self,
            reference: &OrderReference,
            outcome: &GatewayOutcome,
        ) -> Result<OutcomeWrite, DomainError> {
            self.both_arrived.wait().await;
            if outcome.status == OrderStatus::Declined {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.inner.record_outcome(reference, outcome).await
        }

        async fn find_by_reference(
            &self,
            reference: &OrderReference,
        ) -> Result<Option<Order>, DomainError> {
            self.inner.find_by_reference(reference).await
        }
    }

    #[tokio::test]
    async fn racing_decline_does_not_regress_approved_order() {
        let orders = InMemoryOrderRepository::new();
        let reference = OrderReference::from_stored(REFERENCE);
        orders
            .save(&Order::new(
                reference.clone(),
                user(),
                PlanId::ThirtyDays,
                299,
                "UAH",
                at(1_700_000_000),
            ))
            .await
            .unwrap();
        let handler = HandlePaymentCallbackHandler::new(
            Arc::new(callback_verifier(true)),
            Arc::new(InMemoryEntitlementRepository::new()),
            Arc::new(DeclineLandsLast {
                inner: orders.clone(),
                both_arrived: Barrier::new(2),
            }),
            Arc::new(InMemoryEventBus::new()),
        );

        let (approved, declined) = tokio::join!(
            handler.handle(command(
                signed_callback_body(REFERENCE, "Approved", MERCHANT),
                at(1_700_000_100),
            )),
            handler.handle(command(
                signed_callback_body(REFERENCE, "Declined", MERCHANT),
                at(1_700_000_100),
            )),
        );
        approved.unwrap();
        declined.unwrap();

        let order = orders.find_by_reference(&reference).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Approved);
        assert_eq!(order.gateway_status.as_deref(), Some("Approved"));
    }

    #[tokio::test]
    async fn notification_failure_still_acknowledges() {
        let entitlements = InMemoryEntitlementRepository::new();
        let handler = HandlePaymentCallbackHandler::new(
            Arc::new(callback_verifier(true)),
            Arc::new(entitlements.clone()),
            Arc::new(InMemoryOrderRepository::new()),
            failing_publisher(),
        );

        let result = handler
            .handle(command(
                signed_callback_body(REFERENCE, "Approved", MERCHANT),
                at(1_700_000_100),
            ))
            .await
            .unwrap();

        assert!(matches!(result.outcome, CallbackOutcome::EntitlementApplied { .. }));
        assert_eq!(entitlements.len().await, 1);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // No Mutation
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn declined_status_changes_nothing() {
        let f = fixture();
        let result = f
            .handler
            .handle(command(
                signed_callback_body(REFERENCE, "Declined", MERCHANT),
                at(1_700_000_100),
            ))
            .await
            .unwrap();

        assert_eq!(
            result.outcome,
            CallbackOutcome::NoChange {
                transaction_status: "Declined".to_string()
            }
        );
        assert!(f.entitlements.is_empty().await);
        assert_eq!(f.bus.event_count(), 0);
    }

    #[tokio::test]
    async fn merchant_mismatch_is_rejected_with_ack() {
        let f = fixture();
        let (capture, _guard) = capture_events();
        let result = f
            .handler
            .handle(command(
                signed_callback_body(REFERENCE, "Approved", "impostor"),
                at(1_700_000_100),
            ))
            .await
            .unwrap();

        assert!(matches!(
            result.outcome,
            CallbackOutcome::Rejected {
                reason: BillingError::AuthenticationFailure(_)
            }
        ));
        assert_eq!(result.acknowledgment.status, "accept");
        assert!(f.entitlements.is_empty().await);

        let alerts: Vec<_> = capture
            .events()
            .into_iter()
            .filter(|e| e.field("alert") == Some("payment_fraud_signal"))
            .collect();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, tracing::Level::ERROR);
        assert_eq!(alerts[0].field("order_reference"), Some(REFERENCE));
    }

    #[tokio::test]
    async fn declined_status_raises_no_fraud_alert() {
        let f = fixture();
        let (capture, _guard) = capture_events();
        f.handler
            .handle(command(
                signed_callback_body(REFERENCE, "Declined", MERCHANT),
                at(1_700_000_100),
            ))
            .await
            .unwrap();

        assert!(capture
            .events()
            .iter()
            .all(|e| e.field("alert").is_none()));
    }

    #[tokio::test]
    async fn forged_callback_does_not_touch_ledger() {
        let f = fixture();
        let reference = OrderReference::from_stored(REFERENCE);
        f.orders
            .save(&Order::new(
                reference.clone(),
                user(),
                PlanId::ThirtyDays,
                299,
                "UAH",
                at(1_700_000_000),
            ))
            .await
            .unwrap();

        let mut body: serde_json::Value =
            serde_json::from_slice(&signed_callback_body(REFERENCE, "Approved", MERCHANT)).unwrap();
        body["merchantSignature"] = serde_json::json!("00000000000000000000000000000000");
        f.handler
            .handle(command(serde_json::to_vec(&body).unwrap(), at(1_700_000_100)))
            .await
            .unwrap();

        let order = f.orders.find_by_reference(&reference).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Created);
        assert!(f.entitlements.is_empty().await);
    }

    #[tokio::test]
    async fn malformed_reference_is_rejected() {
        let f = fixture();
        let result = f
            .handler
            .handle(command(
                signed_callback_body("order_u123", "Approved", MERCHANT),
                at(1_700_000_100),
            ))
            .await
            .unwrap();

        assert!(matches!(
            result.outcome,
            CallbackOutcome::Rejected {
                reason: BillingError::MalformedRequest(_)
            }
        ));
        assert_eq!(result.acknowledgment.order_reference, "order_u123");
        assert!(f.entitlements.is_empty().await);
    }

    #[tokio::test]
    async fn rejected_callbacks_leave_existing_rows_unchanged() {
        let f = fixture();
        let plans = catalog();
        let existing = Entitlement::granted(
            user(),
            plans.get(PlanId::TenDays).unwrap(),
            at(1_699_000_000),
        );
        f.entitlements.upsert(&existing).await.unwrap();

        for reference in ["order_u123", "order_u123_90days_1", "u123_30days"] {
            let result = f
                .handler
                .handle(command(
                    signed_callback_body(reference, "Approved", MERCHANT),
                    at(1_700_000_100),
                ))
                .await
                .unwrap();
            assert!(
                matches!(result.outcome, CallbackOutcome::Rejected { .. }),
                "{reference}"
            );
        }

        let row = f.entitlements.find_by_user_id(&user()).await.unwrap();
        assert_eq!(row, Some(existing));
        assert_eq!(f.entitlements.len().await, 1);
        assert_eq!(f.bus.event_count(), 0);
    }

    #[tokio::test]
    async fn unparseable_body_is_acknowledged_with_empty_reference() {
        let f = fixture();
        let result = f
            .handler
            .handle(command(b"not json".to_vec(), at(1_700_000_100)))
            .await
            .unwrap();

        assert_eq!(result.acknowledgment.order_reference, "");
        assert!(matches!(result.outcome, CallbackOutcome::Rejected { .. }));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Storage Failures
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn entitlement_store_outage_is_retryable_error() {
        let f = fixture();
        f.entitlements.set_unavailable(true);

        let err = f
            .handler
            .handle(command(
                signed_callback_body(REFERENCE, "Approved", MERCHANT),
                at(1_700_000_100),
            ))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(f.bus.event_count(), 0);
    }

    #[tokio::test]
    async fn ledger_outage_is_retryable_error() {
        let f = fixture();
        f.orders.set_unavailable(true);

        let err = f
            .handler
            .handle(command(
                signed_callback_body(REFERENCE, "Declined", MERCHANT),
                at(1_700_000_100),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Storage(_)));
    }
}
