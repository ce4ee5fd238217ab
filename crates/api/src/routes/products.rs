//! Catalog route handlers.
//!
//! Product detail and category counts are served from the catalog cache.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
};
use rust_decimal::Decimal;
use serde::Deserialize;

use shopfront_core::ProductId;

use crate::db::products::{CategoryCount, ProductFilter, ProductRepository};
use crate::error::{AppError, Result};
use crate::models::{Page, Pagination, Product, ProductSort};
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub sort: ProductSort,
}

impl ProductQuery {
    /// Catalog filter for these parameters.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a negative price or an inverted range.
    pub fn filter(&self, include_inactive: bool) -> Result<ProductFilter> {
        if self.min_price.is_some_and(|p| p.is_sign_negative())
            || self.max_price.is_some_and(|p| p.is_sign_negative())
        {
            return Err(AppError::Validation("prices must not be negative".to_owned()));
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            return Err(AppError::Validation(
                "min_price must not exceed max_price".to_owned(),
            ));
        }

        Ok(ProductFilter {
            category: non_empty(self.category.as_deref()),
            brand: non_empty(self.brand.as_deref()),
            min_price: self.min_price,
            max_price: self.max_price,
            include_inactive,
            text: None,
        })
    }

    #[must_use]
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Active products, filtered and sorted.
///
/// # Route
///
/// `GET /api/products`
pub async fn index(
    State(state): State<AppState>,
    query: std::result::Result<Query<ProductQuery>, QueryRejection>,
) -> Result<Json<Page<Product>>> {
    let Query(query) = query?;
    let filter = query.filter(false)?;

    let page = ProductRepository::new(state.pool())
        .list(&filter, query.sort, query.pagination())
        .await?;
    Ok(Json(page))
}

/// Categories of active products with counts.
///
/// # Route
///
/// `GET /api/products/categories`
pub async fn categories(State(state): State<AppState>) -> Result<Json<Arc<Vec<CategoryCount>>>> {
    if let Some(cached) = state.catalog().categories().await {
        return Ok(Json(cached));
    }

    let categories = Arc::new(ProductRepository::new(state.pool()).categories().await?);
    state.catalog().insert_categories(Arc::clone(&categories)).await;
    Ok(Json(categories))
}

/// Product detail. Inactive products are hidden.
///
/// # Route
///
/// `GET /api/products/{id}`
pub async fn show(
    State(state): State<AppState>,
    id: std::result::Result<Path<ProductId>, PathRejection>,
) -> Result<Json<Product>> {
    let Path(id) = id?;

    if let Some(product) = state.catalog().product(id).await {
        return Ok(Json(product));
    }

    let product = ProductRepository::new(state.pool())
        .get_active(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;
    state.catalog().insert_product(product.clone()).await;
    Ok(Json(product))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(min: Option<i64>, max: Option<i64>) -> ProductQuery {
        ProductQuery {
            min_price: min.map(Decimal::from),
            max_price: max.map(Decimal::from),
            ..ProductQuery::default()
        }
    }

    #[test]
    fn test_filter_rejects_bad_ranges() {
        assert!(query(Some(-1), None).filter(false).is_err());
        assert!(query(Some(50), Some(10)).filter(false).is_err());
        assert!(query(Some(10), Some(10)).filter(false).is_ok());
    }

    #[test]
    fn test_filter_ignores_blank_text() {
        let query = ProductQuery {
            category: Some("  ".to_owned()),
            brand: Some(" Acme ".to_owned()),
            ..ProductQuery::default()
        };
        let filter = query.filter(true).unwrap();
        assert!(filter.category.is_none());
        assert_eq!(filter.brand.as_deref(), Some("Acme"));
        assert!(filter.include_inactive);
    }
}
