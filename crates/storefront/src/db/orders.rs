//! Order queries for [`PgStore`].
//!
//! Status changes are single conditional `UPDATE`s; the `WHERE` clause is the
//! compare half of the compare-and-set.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;

use clubmart_core::{
    Order, OrderId, OrderItem, OrderStatus, Page, PageInfo, Price, ShippingInfo, UserId,
};

use super::{OrderStore, PgStore, RepositoryError, to_i64};
use crate::models::NewOrder;

const ORDER_COLUMNS: &str = "id, user_id, status, items, total_amount, shipping_info, \
                             payment_reference, created_at, updated_at, expires_at, paid_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    items: Json<Vec<OrderItem>>,
    total_amount: Price,
    shipping_info: Json<ShippingInfo>,
    payment_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            status: row.status,
            items: row.items.0,
            total_amount: row.total_amount,
            shipping_info: row.shipping_info.0,
            payment_reference: row.payment_reference,
            created_at: row.created_at,
            updated_at: row.updated_at,
            expires_at: row.expires_at,
            paid_at: row.paid_at,
        }
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let row: OrderRow = sqlx::query_as(&format!(
            r"
            INSERT INTO clubmart.orders
                (id, user_id, status, items, total_amount, shipping_info, expires_at)
            VALUES ($1, $2, 'pending', $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.id)
        .bind(order.user_id)
        .bind(Json(&order.items))
        .bind(order.total_amount)
        .bind(Json(&order.shipping_info))
        .bind(order.expires_at)
        .fetch_one(self.pool())
        .await?;

        Ok(row.into())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM clubmart.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Order::from))
    }

    async fn list_orders(
        &self,
        user: UserId,
        page: u64,
        limit: u64,
    ) -> Result<Page<Order>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clubmart.orders WHERE user_id = $1")
            .bind(user)
            .fetch_one(self.pool())
            .await?;

        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM clubmart.orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id ASC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(user)
        .bind(to_i64(limit))
        .bind(to_i64(page.saturating_sub(1).saturating_mul(limit)))
        .fetch_all(self.pool())
        .await?;

        Ok(Page {
            items: rows.into_iter().map(Order::from).collect(),
            info: PageInfo::new(u64::try_from(total).unwrap_or_default(), page, limit),
        })
    }

    async fn mark_order_paid(
        &self,
        id: OrderId,
        payment_reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r"
            UPDATE clubmart.orders
            SET status = 'paid', payment_reference = $2, paid_at = $3, updated_at = $3
            WHERE id = $1 AND status = 'pending' AND expires_at > $3
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(payment_reference)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Order::from))
    }

    async fn cancel_order(
        &self,
        id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r"
            UPDATE clubmart.orders
            SET status = 'cancelled', updated_at = $2
            WHERE id = $1 AND status IN ('pending', 'paid')
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Order::from))
    }

    async fn expire_pending_orders(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE clubmart.orders
            SET status = 'expired', updated_at = $1
            WHERE status = 'pending' AND expires_at <= $1
            ",
        )
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }
}
