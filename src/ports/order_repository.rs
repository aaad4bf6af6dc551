//! Order ledger port.

use async_trait::async_trait;

use crate::domain::billing::{GatewayOutcome, Order, OrderReference};
use crate::domain::foundation::DomainError;

/// What [`OrderRepository::record_outcome`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeWrite {
    Applied,
    /// The stored status refused the outcome; nothing was written.
    Stale,
    /// No order with this reference.
    Missing,
}

/// Persistence for issued orders and their latest gateway outcome.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Records a freshly built order.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the reference already exists
    /// - `DatabaseError` on persistence failure
    async fn save(&self, order: &Order) -> Result<(), DomainError>;

    /// Applies a gateway outcome to an existing order in one atomic write.
    ///
    /// The no-regress rule of [`OrderStatus::accepts`] is checked inside the
    /// write, so concurrent callbacks for one order cannot undo an approval
    /// whatever order they land in.
    ///
    /// [`OrderStatus::accepts`]: crate::domain::billing::OrderStatus::accepts
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn record_outcome(
        &self,
        reference: &OrderReference,
        outcome: &GatewayOutcome,
    ) -> Result<OutcomeWrite, DomainError>;

    async fn find_by_reference(
        &self,
        reference: &OrderReference,
    ) -> Result<Option<Order>, DomainError>;
}
