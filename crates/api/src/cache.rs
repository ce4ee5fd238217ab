//! In-memory catalog cache.
//!
//! Product detail and category counts are cached with `moka` for five
//! minutes. Admin writes invalidate the affected entries.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use shopfront_core::ProductId;

use crate::db::products::CategoryCount;
use crate::models::Product;

const TTL: Duration = Duration::from_secs(300);

/// Cache key for catalog responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Product(ProductId),
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Categories(Arc<Vec<CategoryCount>>),
}

/// Catalog cache. Cheap to clone.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(1000)
                .time_to_live(TTL)
                .build(),
        }
    }

    pub async fn product(&self, id: ProductId) -> Option<Product> {
        match self.cache.get(&CacheKey::Product(id)).await {
            Some(CacheValue::Product(product)) => Some(*product),
            _ => None,
        }
    }

    pub async fn insert_product(&self, product: Product) {
        self.cache
            .insert(CacheKey::Product(product.id), CacheValue::Product(Box::new(product)))
            .await;
    }

    pub async fn categories(&self) -> Option<Arc<Vec<CategoryCount>>> {
        match self.cache.get(&CacheKey::Categories).await {
            Some(CacheValue::Categories(categories)) => Some(categories),
            _ => None,
        }
    }

    pub async fn insert_categories(&self, categories: Arc<Vec<CategoryCount>>) {
        self.cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories))
            .await;
    }

    /// Drop a product and the category counts it contributes to.
    pub async fn invalidate_product(&self, id: ProductId) {
        self.cache.invalidate(&CacheKey::Product(id)).await;
        self.cache.invalidate(&CacheKey::Categories).await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}
