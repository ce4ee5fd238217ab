//! Order repository for database operations.
//!
//! Placing and cancelling an order move stock, so both run in a transaction
//! that locks the affected product rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use shopfront_core::{OrderId, OrderStatus, PaymentStatus, UserId};

use super::RepositoryError;
use super::products::PRODUCT_COLUMNS;
use crate::config::CheckoutConfig;
use crate::models::{
    CartDocument, Order, OrderItem, OrderSummary, OrderTotals, Page, Pagination, PaymentMethod,
    Product, ShippingAddress,
};
use crate::services::checkout::{self, CheckoutError};

const ORDER_COLUMNS: &str = "id, user_id, items, shipping_address, subtotal, shipping, tax, \
                             total, status, payment_method, payment_status, payment_reference, \
                             paid_at, delivered_at, created_at, updated_at";

const SUMMARY_COLUMNS: &str = "id, user_id, total, status, payment_status, created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: Option<UserId>,
    items: Json<Vec<OrderItem>>,
    shipping_address: Json<ShippingAddress>,
    subtotal: Decimal,
    shipping: Decimal,
    tax: Decimal,
    total: Decimal,
    status: OrderStatus,
    payment_method: String,
    payment_status: PaymentStatus,
    payment_reference: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let payment_method = row
            .payment_method
            .parse::<PaymentMethod>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            shipping_address: row.shipping_address.0,
            totals: OrderTotals {
                subtotal: row.subtotal,
                shipping: row.shipping,
                tax: row.tax,
                total: row.total,
            },
            status: row.status,
            payment_method,
            payment_status: row.payment_status,
            payment_reference: row.payment_reference,
            paid_at: row.paid_at,
            delivered_at: row.delivered_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Checkout request, after the shipping address has been resolved.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Number of orders in one status.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// Order figures for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct OrderStats {
    pub total_orders: i64,
    pub revenue: Decimal,
    pub by_status: Vec<StatusCount>,
    pub recent: Vec<OrderSummary>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order from `cart`.
    ///
    /// In one transaction: lock the products, re-check stock, snapshot the
    /// lines, decrement stock, insert the order and empty the user's cart.
    ///
    /// # Errors
    ///
    /// Returns the `CheckoutError` describing why the cart cannot be ordered,
    /// or `CheckoutError::Repository` if a query fails.
    pub async fn create(
        &self,
        order: &NewOrder,
        cart: &CartDocument,
        pricing: &CheckoutConfig,
    ) -> Result<Order, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let ids: Vec<i32> = cart.items().iter().map(|i| i.product_id.as_i32()).collect();
        let products = lock_products(&mut tx, &ids).await?;

        let items = checkout::price_lines(cart, &products)?;
        let totals = checkout::compute_totals(&items, pricing)?;

        adjust_stock(&mut tx, &items, StockChange::Take).await?;

        let sql = format!(
            r"
            INSERT INTO shop.order
                (user_id, items, shipping_address, subtotal, shipping, tax, total, payment_method)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ORDER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order.user_id)
            .bind(Json(&items))
            .bind(Json(&order.shipping_address))
            .bind(totals.subtotal)
            .bind(totals.shipping)
            .bind(totals.tax)
            .bind(totals.total)
            .bind(order.payment_method.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

        sqlx::query("DELETE FROM shop.cart WHERE user_id = $1")
            .bind(order.user_id)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(Order::try_from(row)?)
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM shop.order WHERE id = $1");
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_user(
        &self,
        user_id: UserId,
        pagination: Pagination,
    ) -> Result<Page<Order>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop.order WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        let sql = format!(
            r"
            SELECT {ORDER_COLUMNS} FROM shop.order
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "
        );
        let items = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, pagination, total))
    }

    /// All orders, optionally in one status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        pagination: Pagination,
    ) -> Result<Page<Order>, RepositoryError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM shop.order");
        if let Some(status) = status {
            count_query.push(" WHERE status = ").push_bind(status);
        }
        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM shop.order"));
        if let Some(status) = status {
            query.push(" WHERE status = ").push_bind(status);
        }
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let items = query
            .build_query_as::<OrderRow>()
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, pagination, total))
    }

    /// Record a payment.
    ///
    /// Payment moves from `pending` to `paid` and a pending order starts processing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order is already paid or cancelled.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_paid(&self, id: OrderId, reference: &str) -> Result<Order, RepositoryError> {
        let sql = format!(
            r"
            UPDATE shop.order
            SET payment_status = 'paid',
                paid_at = NOW(),
                payment_reference = $2,
                status = CASE WHEN status = 'pending'
                              THEN 'processing'::shop.order_status
                              ELSE status END
            WHERE id = $1 AND payment_status = 'pending' AND status <> 'cancelled'
            RETURNING {ORDER_COLUMNS}
            "
        );
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(reference)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| RepositoryError::Conflict("order cannot be paid".to_owned()))?
            .try_into()
    }

    /// Move an order from `from` to `to`.
    ///
    /// `delivered` records `delivered_at`. `cancelled` puts the items back in
    /// stock and refunds a paid order. Callers check that the transition is
    /// legal; the update only applies while the order is still in `from`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order's status changed meanwhile.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r"
            UPDATE shop.order
            SET status = $3,
                delivered_at = CASE WHEN $3 = 'delivered'::shop.order_status
                                    THEN NOW() ELSE delivered_at END,
                payment_status = CASE WHEN $3 = 'cancelled'::shop.order_status
                                           AND payment_status = 'paid'
                                      THEN 'refunded'::shop.payment_status
                                      ELSE payment_status END
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "
        );
        let order: Order = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::Conflict("order status has changed".to_owned()))?
            .try_into()?;

        if to == OrderStatus::Cancelled {
            adjust_stock(&mut tx, &order.items, StockChange::Return).await?;
        }

        tx.commit().await?;

        tracing::info!(order_id = %id, from = %from, to = %to, "Order status changed");
        Ok(order)
    }

    /// Cancel an order, restocking its items.
    ///
    /// # Errors
    ///
    /// See [`Self::update_status`].
    pub async fn cancel(&self, id: OrderId, from: OrderStatus) -> Result<Order, RepositoryError> {
        self.update_status(id, from, OrderStatus::Cancelled).await
    }

    /// Order count, paid revenue, per-status counts and the latest orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn stats(&self, recent: i64) -> Result<OrderStats, RepositoryError> {
        let (total_orders, revenue): (i64, Decimal) = sqlx::query_as(
            r"
            SELECT COUNT(*),
                   COALESCE(SUM(total) FILTER (WHERE payment_status = 'paid'), 0)
            FROM shop.order
            ",
        )
        .fetch_one(self.pool)
        .await?;

        let by_status = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM shop.order GROUP BY status ORDER BY status",
        )
        .fetch_all(self.pool)
        .await?;

        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM shop.order ORDER BY created_at DESC, id DESC LIMIT $1"
        );
        let recent = sqlx::query_as::<_, OrderSummary>(&sql)
            .bind(recent)
            .fetch_all(self.pool)
            .await?;

        Ok(OrderStats {
            total_orders,
            revenue,
            by_status,
            recent,
        })
    }
}

/// Lock the rows of `ids` in id order so concurrent checkouts can't deadlock.
async fn lock_products(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[i32],
) -> Result<Vec<Product>, RepositoryError> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    );
    Ok(sqlx::query_as::<_, Product>(&sql)
        .bind(ids)
        .fetch_all(&mut **tx)
        .await?)
}

#[derive(Debug, Clone, Copy)]
enum StockChange {
    Take,
    Return,
}

async fn adjust_stock(
    tx: &mut Transaction<'_, Postgres>,
    items: &[OrderItem],
    change: StockChange,
) -> Result<(), RepositoryError> {
    let ids: Vec<i32> = items.iter().map(|i| i.product_id.as_i32()).collect();
    let deltas = items
        .iter()
        .map(|item| {
            let quantity = i32::try_from(item.quantity).map_err(|_| {
                RepositoryError::DataCorruption(format!("quantity out of range: {}", item.quantity))
            })?;
            Ok(match change {
                StockChange::Take => -quantity,
                StockChange::Return => quantity,
            })
        })
        .collect::<Result<Vec<i32>, RepositoryError>>()?;

    // Deleted products are skipped on restock.
    sqlx::query(
        r"
        UPDATE shop.product AS p
        SET stock = p.stock + d.delta
        FROM UNNEST($1::int4[], $2::int4[]) AS d(id, delta)
        WHERE p.id = d.id
        ",
    )
    .bind(&ids)
    .bind(&deltas)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
