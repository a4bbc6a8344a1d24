//! Postgres implementation of OrderRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{Order, OrderStatus};
use crate::ports::{OrderRepository, RepositoryError, RepositoryResult};

/// Postgres-backed order repository.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn create(&self, order: &Order) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, reference, amount, currency, status, product_name,
                psp_reference, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id)
        .bind(&order.reference)
        .bind(order.amount)
        .bind(&order.currency)
        .bind(order.status.as_str())
        .bind(&order.product_name)
        .bind(&order.psp_reference)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn get_by_reference(&self, reference: &str) -> RepositoryResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, reference, amount, currency, status, product_name,
                   psp_reference, created_at, updated_at
            FROM orders
            WHERE reference = $1
            "#,
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(reference.to_string()))?
            .into_domain()
    }

    async fn update_status(
        &self,
        reference: &str,
        status: OrderStatus,
        psp_reference: Option<&str>,
    ) -> RepositoryResult<()> {
        let psp_reference = psp_reference.filter(|psp| !psp.is_empty());

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $1, psp_reference = $2, updated_at = NOW()
            WHERE reference = $3
            "#,
        )
        .bind(status.as_str())
        .bind(psp_reference)
        .bind(reference)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(reference.to_string()));
        }

        Ok(())
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    reference: String,
    amount: i64,
    currency: String,
    status: String,
    product_name: String,
    psp_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_domain(self) -> RepositoryResult<Order> {
        let status = OrderStatus::from_str(&self.status).map_err(|_| {
            RepositoryError::Database(format!(
                "order {} has unknown status {:?}",
                self.reference, self.status
            ))
        })?;

        Ok(Order {
            id: self.id,
            reference: self.reference,
            amount: self.amount,
            currency: self.currency,
            product_name: self.product_name,
            status,
            psp_reference: self.psp_reference.filter(|psp| !psp.is_empty()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
