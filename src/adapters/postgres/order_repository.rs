//! PostgreSQL implementation of OrderRepository.
//!
//! Rows live in `payment_orders`, keyed by `order_reference`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{GatewayOutcome, Order, OrderReference, OrderStatus, PlanId};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{OrderRepository, OutcomeWrite};

pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    order_reference: String,
    user_id: String,
    plan_id: String,
    amount: i32,
    currency: String,
    status: String,
    gateway_status: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let invalid = |field: &str, e: String| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid {}: {}", field, e))
        };

        Ok(Order {
            reference: OrderReference::from_stored(row.order_reference),
            user_id: UserId::new(row.user_id).map_err(|e| invalid("user_id", e.to_string()))?,
            plan_id: row
                .plan_id
                .parse::<PlanId>()
                .map_err(|e| invalid("plan_id", e.to_string()))?,
            amount: u32::try_from(row.amount).map_err(|e| invalid("amount", e.to_string()))?,
            currency: row.currency,
            status: row
                .status
                .parse::<OrderStatus>()
                .map_err(|e| invalid("status", e.to_string()))?,
            gateway_status: row.gateway_status,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn save(&self, order: &Order) -> Result<(), DomainError> {
        let amount = i32::try_from(order.amount).map_err(|_| {
            DomainError::validation("amount", "Order amount exceeds storage range")
        })?;

        sqlx::query(
            r#"
            INSERT INTO payment_orders (
                order_reference, user_id, plan_id, amount, currency,
                status, gateway_status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.reference.as_str())
        .bind(order.user_id.as_str())
        .bind(order.plan_id.as_str())
        .bind(amount)
        .bind(&order.currency)
        .bind(order.status.as_str())
        .bind(&order.gateway_status)
        .bind(order.created_at.as_datetime())
        .bind(order.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("payment_orders_pkey") {
                    return DomainError::validation(
                        "order_reference",
                        "Order reference already exists",
                    );
                }
            }
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to save order: {}", e))
        })?;

        Ok(())
    }

    async fn record_outcome(
        &self,
        reference: &OrderReference,
        outcome: &GatewayOutcome,
    ) -> Result<OutcomeWrite, DomainError> {
        // Postgres re-checks the WHERE clause against the committed row when a
        // concurrent UPDATE holds the lock, so the guard sees the winner.
        let result = sqlx::query(
            r#"
            UPDATE payment_orders SET
                status = $2,
                gateway_status = $3,
                updated_at = $4
            WHERE order_reference = $1
              AND NOT (status = 'approved' AND $5)
            "#,
        )
        .bind(reference.as_str())
        .bind(outcome.status.as_str())
        .bind(&outcome.gateway_status)
        .bind(outcome.at.as_datetime())
        .bind(outcome.status.is_pre_approval())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to update order: {}", e))
        })?;

        if result.rows_affected() > 0 {
            return Ok(OutcomeWrite::Applied);
        }

        let exists: Option<(String,)> =
            sqlx::query_as("SELECT status FROM payment_orders WHERE order_reference = $1")
                .bind(reference.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to load order: {}", e),
                    )
                })?;

        Ok(match exists {
            Some(_) => OutcomeWrite::Stale,
            None => OutcomeWrite::Missing,
        })
    }

    async fn find_by_reference(
        &self,
        reference: &OrderReference,
    ) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT order_reference, user_id, plan_id, amount, currency,
                   status, gateway_status, created_at, updated_at
            FROM payment_orders
            WHERE order_reference = $1
            "#,
        )
        .bind(reference.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to load order: {}", e))
        })?;

        row.map(Order::try_from).transpose()
    }
}
