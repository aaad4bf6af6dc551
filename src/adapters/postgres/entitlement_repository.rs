//! PostgreSQL implementation of EntitlementRepository.
//!
//! Rows live in `user_subscriptions`, keyed by `user_id`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{Entitlement, Plan};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::EntitlementRepository;

pub struct PostgresEntitlementRepository {
    pool: PgPool,
}

impl PostgresEntitlementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EntitlementRow {
    user_id: String,
    plan: String,
    expires_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EntitlementRow> for Entitlement {
    type Error = DomainError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        let plan: Plan = row.plan.parse().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid plan value: {}", e))
        })?;
        let user_id = UserId::new(row.user_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
        })?;

        Ok(Entitlement {
            user_id,
            plan,
            expires_at: row.expires_at.map(Timestamp::from_datetime),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl EntitlementRepository for PostgresEntitlementRepository {
    async fn upsert(&self, entitlement: &Entitlement) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO user_subscriptions (user_id, plan, expires_at, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                plan = EXCLUDED.plan,
                expires_at = EXCLUDED.expires_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(entitlement.user_id.as_str())
        .bind(entitlement.plan.as_str())
        .bind(entitlement.expires_at.map(|t| *t.as_datetime()))
        .bind(entitlement.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to upsert entitlement: {}", e),
            )
        })?;

        Ok(())
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Entitlement>, DomainError> {
        let row: Option<EntitlementRow> = sqlx::query_as(
            r#"
            SELECT user_id, plan, expires_at, updated_at
            FROM user_subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to load entitlement: {}", e),
            )
        })?;

        row.map(Entitlement::try_from).transpose()
    }
}
