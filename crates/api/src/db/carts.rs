//! Cart repository for database operations.
//!
//! Each owner has at most one cart row; the lines live in the `items` JSONB
//! document and are edited through [`CartDocument`].

use std::collections::HashMap;

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shopfront_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::CartDocument;

/// Who a cart belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOwner {
    /// A signed-in user.
    User(UserId),
    /// An anonymous visitor identified by the guest cookie.
    Guest(Uuid),
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load the owner's cart. A missing cart is an empty document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn load(&self, owner: CartOwner) -> Result<CartDocument, RepositoryError> {
        let items = match owner {
            CartOwner::User(id) => {
                sqlx::query_scalar::<_, Json<CartDocument>>(
                    "SELECT items FROM shop.cart WHERE user_id = $1",
                )
                .bind(id)
                .fetch_optional(self.pool)
                .await?
            }
            CartOwner::Guest(token) => {
                sqlx::query_scalar::<_, Json<CartDocument>>(
                    "SELECT items FROM shop.cart WHERE guest_token = $1",
                )
                .bind(token)
                .fetch_optional(self.pool)
                .await?
            }
        };

        Ok(items.map(|Json(doc)| doc).unwrap_or_default())
    }

    /// Store the owner's cart document, creating the row if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save(&self, owner: CartOwner, cart: &CartDocument) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        save_with(&mut conn, owner, cart).await
    }

    /// Delete the owner's cart row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, owner: CartOwner) -> Result<(), RepositoryError> {
        let query = match owner {
            CartOwner::User(id) => sqlx::query("DELETE FROM shop.cart WHERE user_id = $1").bind(id),
            CartOwner::Guest(token) => {
                sqlx::query("DELETE FROM shop.cart WHERE guest_token = $1").bind(token)
            }
        };
        query.execute(self.pool).await?;
        Ok(())
    }

    /// Fold a guest cart into a user's cart and drop the guest cart.
    ///
    /// Quantities of the same product are summed and capped at current stock;
    /// lines for inactive or deleted products are dropped. Returns the merged
    /// document, or `None` if the guest had no cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    pub async fn merge_guest_into_user(
        &self,
        guest_token: Uuid,
        user_id: UserId,
    ) -> Result<Option<CartDocument>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let guest = sqlx::query_scalar::<_, Json<CartDocument>>(
            "DELETE FROM shop.cart WHERE guest_token = $1 RETURNING items",
        )
        .bind(guest_token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(Json(guest)) = guest else {
            tx.commit().await?;
            return Ok(None);
        };

        let mut cart = sqlx::query_scalar::<_, Json<CartDocument>>(
            "SELECT items FROM shop.cart WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(|Json(doc)| doc)
        .unwrap_or_default();

        let product_ids: Vec<i32> = cart
            .items()
            .iter()
            .chain(guest.items())
            .map(|i| i.product_id.as_i32())
            .collect();
        let stock = active_stock(&mut tx, &product_ids).await?;

        cart.merge(guest, |id| stock.get(&id).copied());
        save_with(&mut tx, CartOwner::User(user_id), &cart).await?;

        tx.commit().await?;
        Ok(Some(cart))
    }
}

async fn save_with(
    conn: &mut sqlx::PgConnection,
    owner: CartOwner,
    cart: &CartDocument,
) -> Result<(), RepositoryError> {
    let query = match owner {
        CartOwner::User(id) => sqlx::query(
            r"
            INSERT INTO shop.cart (user_id, items) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET items = EXCLUDED.items
            ",
        )
        .bind(id)
        .bind(Json(cart)),
        CartOwner::Guest(token) => sqlx::query(
            r"
            INSERT INTO shop.cart (guest_token, items) VALUES ($1, $2)
            ON CONFLICT (guest_token) DO UPDATE SET items = EXCLUDED.items
            ",
        )
        .bind(token)
        .bind(Json(cart)),
    };

    query.execute(&mut *conn).await?;
    Ok(())
}

/// Current stock of the active products among `ids`.
async fn active_stock(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[i32],
) -> Result<HashMap<ProductId, i32>, RepositoryError> {
    let rows: Vec<(ProductId, i32)> =
        sqlx::query_as("SELECT id, stock FROM shop.product WHERE id = ANY($1) AND is_active")
            .bind(ids)
            .fetch_all(&mut **tx)
            .await?;
    Ok(rows.into_iter().collect())
}
