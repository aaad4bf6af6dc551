//! Entitlements and the expiry gate.
//!
//! The stored row is never downgraded when it lapses. Expiry is applied when
//! the row is read, through [`effective_plan`], so no background job is
//! needed to keep access correct.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

use super::plan::{Plan, PlanDefinition};

const SECONDS_PER_DAY: i64 = 86_400;

/// Persisted plan and expiry for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub user_id: UserId,
    pub plan: Plan,
    pub expires_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl Entitlement {
    /// Entitlement produced by an approved payment received at `now`.
    ///
    /// Expiry counts from `now`; remaining time on an earlier grant is not
    /// carried over.
    pub fn granted(user_id: UserId, plan: &PlanDefinition, now: Timestamp) -> Self {
        Self {
            user_id,
            plan: plan.plan,
            expires_at: Some(now.add_days(i64::from(plan.duration_days))),
            updated_at: now,
        }
    }

    pub fn effective_plan(&self, now: Timestamp) -> Plan {
        match self.expires_at {
            Some(expires_at) if expires_at <= now => Plan::Free,
            _ => self.plan,
        }
    }

    /// Whole days of paid access left, rounded up. Zero once lapsed.
    pub fn days_remaining(&self, now: Timestamp) -> i64 {
        match self.expires_at {
            Some(expires_at) if expires_at > now => {
                let secs = expires_at.duration_since(&now).num_seconds();
                (secs + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
            }
            _ => 0,
        }
    }
}

/// Plan a user may use right now.
///
/// No row, or a row whose expiry has passed, means free.
pub fn effective_plan(entitlement: Option<&Entitlement>, now: Timestamp) -> Plan {
    entitlement.map_or(Plan::Free, |e| e.effective_plan(now))
}

/// Read model served to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementView {
    pub user_id: UserId,
    pub stored_plan: Plan,
    pub effective_plan: Plan,
    pub expires_at: Option<Timestamp>,
    pub days_remaining: i64,
    pub has_paid_access: bool,
    pub listing_limit: Option<usize>,
}

impl EntitlementView {
    pub fn project(user_id: UserId, entitlement: Option<&Entitlement>, now: Timestamp) -> Self {
        let effective = effective_plan(entitlement, now);
        Self {
            user_id,
            stored_plan: entitlement.map_or(Plan::Free, |e| e.plan),
            effective_plan: effective,
            expires_at: entitlement.and_then(|e| e.expires_at),
            days_remaining: entitlement.map_or(0, |e| e.days_remaining(now)),
            has_paid_access: effective.is_paid(),
            listing_limit: effective.listing_limit(),
        }
    }
}
