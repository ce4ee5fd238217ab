//! Checkout pricing.
//!
//! Pure functions that turn a cart document and freshly locked product rows
//! into order lines and totals. The order repository calls these inside the
//! checkout transaction, so the prices and stock they see are the committed ones.

use rust_decimal::Decimal;
use thiserror::Error;

use shopfront_core::{MAX_MONEY, ProductId, fits_money_column, round_money};

use crate::config::CheckoutConfig;
use crate::db::RepositoryError;
use crate::models::{CartDocument, OrderItem, OrderTotals, Product, ShippingAddress};

/// Errors that stop an order from being placed.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("a shipping address is required")]
    MissingAddress,

    #[error("{0}")]
    InvalidAddress(String),

    #[error("product {product_id} is no longer available")]
    ProductUnavailable { product_id: ProductId },

    #[error("only {available} of {name} in stock")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        available: i32,
    },

    #[error("order total must not exceed {MAX_MONEY}")]
    TotalTooLarge,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Pick the address to ship to: the one sent with the order, else the profile default.
///
/// # Errors
///
/// `MissingAddress` when neither is present, `InvalidAddress` when the chosen one is incomplete.
pub fn resolve_shipping_address(
    requested: Option<ShippingAddress>,
    profile_default: Option<&ShippingAddress>,
) -> Result<ShippingAddress, CheckoutError> {
    requested
        .or_else(|| profile_default.cloned())
        .ok_or(CheckoutError::MissingAddress)?
        .normalized()
        .map_err(CheckoutError::InvalidAddress)
}

/// Snapshot each cart line against the locked product rows.
///
/// # Errors
///
/// `EmptyCart`, `ProductUnavailable` for missing or inactive products, and
/// `InsufficientStock` when a line asks for more than is left.
pub fn price_lines(
    cart: &CartDocument,
    products: &[Product],
) -> Result<Vec<OrderItem>, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    cart.items()
        .iter()
        .map(|line| {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id && p.is_active)
                .ok_or(CheckoutError::ProductUnavailable {
                    product_id: line.product_id,
                })?;

            if i64::from(product.stock) < i64::from(line.quantity) {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    name: product.name.clone(),
                    available: product.stock.max(0),
                });
            }

            Ok(OrderItem {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.price,
                quantity: line.quantity,
                line_total: round_money(product.price * Decimal::from(line.quantity)),
            })
        })
        .collect()
}

/// Order totals.
///
/// - subtotal: sum of line totals
/// - shipping: free at or above the threshold, otherwise the flat fee
/// - tax: subtotal times the tax rate, rounded half away from zero to cents
/// - total: subtotal + shipping + tax
///
/// # Errors
///
/// `TotalTooLarge` when any amount would overflow the order's money columns.
pub fn compute_totals(
    items: &[OrderItem],
    pricing: &CheckoutConfig,
) -> Result<OrderTotals, CheckoutError> {
    let subtotal = round_money(items.iter().map(|i| i.line_total).sum());
    let shipping = if subtotal >= pricing.free_shipping_threshold {
        Decimal::ZERO
    } else {
        round_money(pricing.shipping_flat)
    };
    let tax = round_money(subtotal * pricing.tax_rate);
    let total = subtotal + shipping + tax;

    if !fits_money_column(total) {
        return Err(CheckoutError::TotalTooLarge);
    }

    Ok(OrderTotals {
        subtotal,
        shipping,
        tax,
        total,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn product(id: i32, price: Decimal, stock: i32) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            slug: format!("product-{id}"),
            description: String::new(),
            brand: String::new(),
            category: String::new(),
            price,
            stock,
            image_url: None,
            tags: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(id: i32, unit_cents: i64, quantity: u32) -> OrderItem {
        let unit_price = Decimal::new(unit_cents, 2);
        OrderItem {
            product_id: ProductId::new(id),
            name: String::new(),
            unit_price,
            quantity,
            line_total: unit_price * Decimal::from(quantity),
        }
    }

    fn cart(lines: &[(i32, u32)]) -> CartDocument {
        let mut cart = CartDocument::default();
        for &(id, qty) in lines {
            cart.add(ProductId::new(id), qty, i32::MAX, Utc::now()).unwrap();
        }
        cart
    }

    #[test]
    fn test_totals_below_free_shipping_threshold() {
        let totals = compute_totals(&[line(1, 1999, 2)], &CheckoutConfig::default()).unwrap();
        assert_eq!(totals.subtotal, Decimal::new(3998, 2));
        assert_eq!(totals.shipping, Decimal::new(1000, 2));
        // 39.98 * 0.08 = 3.1984
        assert_eq!(totals.tax, Decimal::new(320, 2));
        assert_eq!(totals.total, Decimal::new(5318, 2));
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let totals = compute_totals(&[line(1, 5000, 2)], &CheckoutConfig::default()).unwrap();
        assert_eq!(totals.subtotal, Decimal::new(100, 0));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::new(800, 2));
        assert_eq!(totals.total, Decimal::new(10800, 2));
    }

    #[test]
    fn test_tax_rounds_half_away_from_zero() {
        let pricing = CheckoutConfig {
            tax_rate: Decimal::new(5, 2),
            ..CheckoutConfig::default()
        };
        // 0.50 * 0.05 = 0.025 -> 0.03
        let totals = compute_totals(&[line(1, 50, 1)], &pricing).unwrap();
        assert_eq!(totals.tax, Decimal::new(3, 2));
    }

    #[test]
    fn test_totals_beyond_money_column_are_rejected() {
        let items = [line(1, 999_999_999_999, 1), line(2, 100, 1)];
        assert!(matches!(
            compute_totals(&items, &CheckoutConfig::default()),
            Err(CheckoutError::TotalTooLarge)
        ));
    }

    #[test]
    fn test_price_lines_snapshots_products() {
        let products = [product(1, Decimal::new(1250, 2), 5), product(2, Decimal::new(300, 2), 1)];
        let items = price_lines(&cart(&[(1, 2), (2, 1)]), &products).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Product 1");
        assert_eq!(items[0].line_total, Decimal::new(2500, 2));
        assert_eq!(items[1].line_total, Decimal::new(300, 2));
    }

    #[test]
    fn test_price_lines_rejects_empty_cart() {
        assert!(matches!(
            price_lines(&CartDocument::default(), &[]),
            Err(CheckoutError::EmptyCart)
        ));
    }

    #[test]
    fn test_price_lines_rejects_unavailable_and_short_stock() {
        let mut inactive = product(1, Decimal::ONE, 10);
        inactive.is_active = false;
        assert!(matches!(
            price_lines(&cart(&[(1, 1)]), &[inactive]),
            Err(CheckoutError::ProductUnavailable { .. })
        ));

        assert!(matches!(
            price_lines(&cart(&[(1, 1)]), &[]),
            Err(CheckoutError::ProductUnavailable { .. })
        ));

        assert!(matches!(
            price_lines(&cart(&[(1, 3)]), &[product(1, Decimal::ONE, 2)]),
            Err(CheckoutError::InsufficientStock { available: 2, .. })
        ));
    }

    #[test]
    fn test_resolve_shipping_address() {
        let profile = ShippingAddress {
            full_name: "Ada".to_owned(),
            line1: "1 Main St".to_owned(),
            line2: None,
            city: "Springfield".to_owned(),
            state: None,
            postal_code: "12345".to_owned(),
            country: "US".to_owned(),
            phone: None,
        };

        assert_eq!(resolve_shipping_address(None, Some(&profile)).unwrap(), profile);
        assert!(matches!(
            resolve_shipping_address(None, None),
            Err(CheckoutError::MissingAddress)
        ));

        let mut incomplete = profile.clone();
        incomplete.postal_code = String::new();
        assert!(matches!(
            resolve_shipping_address(Some(incomplete), Some(&profile)),
            Err(CheckoutError::InvalidAddress(_))
        ));
    }
}
