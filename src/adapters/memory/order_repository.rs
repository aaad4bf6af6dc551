//! In-memory OrderRepository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{GatewayOutcome, Order, OrderReference};
use crate::domain::foundation::DomainError;
use crate::ports::{OrderRepository, OutcomeWrite};

#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderReference, Order>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `DatabaseError` (for tests).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn all(&self) -> Vec<Order> {
        self.orders.read().await.values().cloned().collect()
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("order ledger unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: &Order) -> Result<(), DomainError> {
        self.check_available()?;
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.reference) {
            return Err(DomainError::validation(
                "order_reference",
                "Order reference already exists",
            ));
        }
        orders.insert(order.reference.clone(), order.clone());
        Ok(())
    }

    async fn record_outcome(
        &self,
        reference: &OrderReference,
        outcome: &GatewayOutcome,
    ) -> Result<OutcomeWrite, DomainError> {
        self.check_available()?;
        // Check and write under one lock.
        let mut orders = self.orders.write().await;
        Ok(match orders.get_mut(reference) {
            Some(order) => {
                if order.record_gateway_outcome(outcome) {
                    OutcomeWrite::Applied
                } else {
                    OutcomeWrite::Stale
                }
            }
            None => OutcomeWrite::Missing,
        })
    }

    async fn find_by_reference(
        &self,
        reference: &OrderReference,
    ) -> Result<Option<Order>, DomainError> {
        self.check_available()?;
        Ok(self.orders.read().await.get(reference).cloned())
    }
}
