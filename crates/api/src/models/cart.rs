//! Cart document.
//!
//! A cart row ties one owner (user or guest token) to a JSONB array of lines.
//! All mutation goes through [`CartDocument`] so the stock rules live in one
//! place and can be tested without a database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shopfront_core::ProductId;

/// One line of a cart document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

/// Errors from cart document operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("only {available} in stock")]
    InsufficientStock { available: u32 },

    #[error("product is not in the cart")]
    NotInCart,
}

/// The product references and quantities held by a cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartDocument {
    items: Vec<CartItem>,
}

impl CartDocument {
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.items
            .iter()
            .find(|i| i.product_id == product_id)
            .map_or(0, |i| i.quantity)
    }

    /// Add `quantity` units, creating the line if needed.
    ///
    /// Returns the resulting line quantity.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity` for zero, `InsufficientStock` when the line would exceed `stock`.
    pub fn add(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        stock: i32,
        now: DateTime<Utc>,
    ) -> Result<u32, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let available = available(stock);
        let requested = self.quantity_of(product_id).saturating_add(quantity);
        if requested > available {
            return Err(CartError::InsufficientStock { available });
        }

        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(line) => line.quantity = requested,
            None => self.items.push(CartItem {
                product_id,
                quantity: requested,
                added_at: now,
            }),
        }

        Ok(requested)
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// `NotInCart` if the line does not exist, `InsufficientStock` if `quantity` exceeds `stock`.
    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        stock: i32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return if self.remove(product_id) {
                Ok(())
            } else {
                Err(CartError::NotInCart)
            };
        }

        let available = available(stock);
        let line = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or(CartError::NotInCart)?;

        if quantity > available {
            return Err(CartError::InsufficientStock { available });
        }

        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line. Returns whether it existed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != before
    }

    /// Keep only lines for which `keep` returns true. Returns how many were dropped.
    pub fn retain(&mut self, keep: impl FnMut(&CartItem) -> bool) -> usize {
        let before = self.items.len();
        self.items.retain(keep);
        before - self.items.len()
    }

    /// Fold another cart (typically a guest cart) into this one.
    ///
    /// Quantities for the same product are summed and capped at the stock
    /// reported by `stock_of`. Lines whose product is gone (`None`) or out of
    /// stock are dropped.
    pub fn merge(&mut self, other: Self, stock_of: impl Fn(ProductId) -> Option<i32>) {
        for incoming in other.items {
            match self
                .items
                .iter_mut()
                .find(|i| i.product_id == incoming.product_id)
            {
                Some(line) => line.quantity = line.quantity.saturating_add(incoming.quantity),
                None => self.items.push(incoming),
            }
        }

        self.items.retain_mut(|line| {
            let cap = stock_of(line.product_id).map_or(0, available);
            line.quantity = line.quantity.min(cap);
            line.quantity > 0
        });
    }
}

fn available(stock: i32) -> u32 {
    u32::try_from(stock).unwrap_or(0)
}
