//! Entitlement store port.
//!
//! One row per user. The store is the only shared mutable state on the
//! callback path, so concurrent approvals for the same user must serialize
//! inside `upsert`.

use async_trait::async_trait;

use crate::domain::billing::Entitlement;
use crate::domain::foundation::{DomainError, UserId};

#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    /// Inserts the row or replaces plan, expiry and update time of the
    /// existing row for the same user, atomically.
    ///
    /// Repeating the call with identical input leaves the same row.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn upsert(&self, entitlement: &Entitlement) -> Result<(), DomainError>;

    /// Returns the stored row, `None` if the user never paid.
    ///
    /// The row is returned as stored; lapsed plans are not filtered here.
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Entitlement>, DomainError>;
}
