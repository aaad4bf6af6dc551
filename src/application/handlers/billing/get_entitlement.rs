//! GetEntitlementHandler - Query handler applying the expiry gate.

use std::sync::Arc;

use crate::domain::billing::{BillingError, EntitlementView};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::EntitlementRepository;

/// Query for a user's current entitlement.
#[derive(Debug, Clone)]
pub struct GetEntitlementQuery {
    pub user_id: String,
    pub now: Timestamp,
}

pub type GetEntitlementResult = EntitlementView;

/// Reads the stored row and projects it through the expiry gate.
///
/// Users without a row, and rows past their expiry, read as the free plan.
/// The stored row itself is never rewritten on read.
pub struct GetEntitlementHandler {
    entitlements: Arc<dyn EntitlementRepository>,
}

impl GetEntitlementHandler {
    pub fn new(entitlements: Arc<dyn EntitlementRepository>) -> Self {
        Self { entitlements }
    }

    pub async fn handle(
        &self,
        query: GetEntitlementQuery,
    ) -> Result<GetEntitlementResult, BillingError> {
        let user_id = UserId::new(query.user_id)?;

        let stored = self
            .entitlements
            .find_by_user_id(&user_id)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user_id, error = %e, "failed to read entitlement");
                BillingError::Storage(e.to_string())
            })?;

        Ok(EntitlementView::project(user_id, stored.as_ref(), query.now))
    }
}
