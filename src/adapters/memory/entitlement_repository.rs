//! In-memory EntitlementRepository.
//!
//! Used by tests and local runs without PostgreSQL. The write lock makes
//! `upsert` atomic per store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::Entitlement;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::EntitlementRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryEntitlementRepository {
    rows: Arc<RwLock<HashMap<UserId, Entitlement>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryEntitlementRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `DatabaseError` (for tests).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("entitlement store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryEntitlementRepository {
    async fn upsert(&self, entitlement: &Entitlement) -> Result<(), DomainError> {
        self.check_available()?;
        self.rows
            .write()
            .await
            .insert(entitlement.user_id.clone(), entitlement.clone());
        Ok(())
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Entitlement>, DomainError> {
        self.check_available()?;
        Ok(self.rows.read().await.get(user_id).cloned())
    }
}
