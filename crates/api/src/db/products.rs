//! Product repository for database operations.
//!
//! Listing and search share one filtered query builder. Text matching comes in
//! two strengths, picked by the search service:
//! - [`TextMatch::FullText`] - `tsvector @@ tsquery`, ranked with `ts_rank`
//! - [`TextMatch::Regex`] - case-insensitive `~*` over the text columns

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use shopfront_core::ProductId;

use super::RepositoryError;
use crate::models::{Page, Pagination, Product, ProductInput, ProductSort};

pub(super) const PRODUCT_COLUMNS: &str = "id, name, slug, description, brand, category, price, stock, \
                               image_url, tags, is_active, created_at, updated_at";

/// Text constraint applied on top of the catalog filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatch {
    /// A `to_tsquery('english', ..)` expression, e.g. `wool:* | sock:*`.
    FullText(String),
    /// A POSIX regular expression matched case-insensitively.
    Regex(String),
}

/// Catalog filters. Empty strings are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub include_inactive: bool,
    pub text: Option<TextMatch>,
}

/// A category and how many active products it holds.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    product: Product,
    inserted: bool,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `filter`, one page at a time.
    ///
    /// Full-text matches are ordered by rank; everything else by `sort`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        pagination: Pagination,
    ) -> Result<Page<Product>, RepositoryError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM shop.product");
        push_where(&mut count_query, filter);
        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        if total == 0 {
            return Ok(Page::empty(pagination));
        }

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product"
        ));
        push_where(&mut query, filter);

        query.push(" ORDER BY ");
        match &filter.text {
            Some(TextMatch::FullText(tsquery)) => {
                query
                    .push("ts_rank(search, to_tsquery('english', ")
                    .push_bind(tsquery.clone())
                    .push(")) DESC, id ASC");
            }
            _ => {
                query.push(sort.order_by());
            }
        }

        query
            .push(" LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let items = query
            .build_query_as::<Product>()
            .fetch_all(self.pool)
            .await?;

        Ok(Page::new(items, pagination, total))
    }

    /// Get a product by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(product)
    }

    /// Get an active product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.get(id).await?.filter(|p| p.is_active))
    }

    /// Fetch several products at once, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = ANY($1)");
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(ids)
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    /// Create a product from a validated input.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let sql = format!(
            "INSERT INTO shop.product \
                 (name, slug, description, brand, category, price, stock, image_url, tags, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let product = bind_input(sqlx::query_as::<_, Product>(&sql), input)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "slug already exists"))?;
        Ok(product)
    }

    /// Replace every editable field of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let sql = format!(
            "UPDATE shop.product SET \
                 name = $1, slug = $2, description = $3, brand = $4, category = $5, \
                 price = $6, stock = $7, image_url = $8, tags = $9, is_active = $10 \
             WHERE id = $11 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        bind_input(sqlx::query_as::<_, Product>(&sql), input)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "slug already exists"))?
            .ok_or(RepositoryError::NotFound)
    }

    /// Insert a product or, if the slug exists, overwrite it.
    ///
    /// Returns the product and whether it was newly inserted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_by_slug(
        &self,
        input: &ProductInput,
    ) -> Result<(Product, bool), RepositoryError> {
        let sql = format!(
            "INSERT INTO shop.product \
                 (name, slug, description, brand, category, price, stock, image_url, tags, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (slug) DO UPDATE SET \
                 name = EXCLUDED.name, description = EXCLUDED.description, \
                 brand = EXCLUDED.brand, category = EXCLUDED.category, \
                 price = EXCLUDED.price, stock = EXCLUDED.stock, \
                 image_url = EXCLUDED.image_url, tags = EXCLUDED.tags, \
                 is_active = EXCLUDED.is_active \
             RETURNING {PRODUCT_COLUMNS}, (xmax = 0) AS inserted"
        );
        let row = bind_input(sqlx::query_as::<_, UpsertRow>(&sql), input)
            .fetch_one(self.pool)
            .await?;
        Ok((row.product, row.inserted))
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete the whole catalog. Returns the number of products removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.product")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Active categories with product counts, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<CategoryCount>, RepositoryError> {
        let categories = sqlx::query_as::<_, CategoryCount>(
            r"
            SELECT category, COUNT(*) AS count
            FROM shop.product
            WHERE is_active AND category <> ''
            GROUP BY category
            ORDER BY category
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// Products at or below `threshold` units, scarcest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(&self, threshold: i32) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product \
             WHERE stock <= $1 ORDER BY stock ASC, name ASC"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(threshold)
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    /// Total number of products, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop.product")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

fn bind_input<'q, O>(
    query: sqlx::query::QueryAs<'q, Postgres, O, sqlx::postgres::PgArguments>,
    input: &'q ProductInput,
) -> sqlx::query::QueryAs<'q, Postgres, O, sqlx::postgres::PgArguments> {
    query
        .bind(&input.name)
        .bind(input.slug())
        .bind(&input.description)
        .bind(&input.brand)
        .bind(&input.category)
        .bind(input.price)
        .bind(input.stock)
        .bind(input.image_url.as_deref())
        .bind(&input.tags)
        .bind(input.is_active)
}

/// Append the `WHERE` clause for `filter`.
fn push_where(query: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    let mut has_where = false;

    if !filter.include_inactive {
        condition(query, &mut has_where).push("is_active");
    }
    if let Some(category) = non_empty(filter.category.as_deref()) {
        condition(query, &mut has_where)
            .push("LOWER(category) = LOWER(")
            .push_bind(category.to_owned())
            .push(")");
    }
    if let Some(brand) = non_empty(filter.brand.as_deref()) {
        condition(query, &mut has_where)
            .push("LOWER(brand) = LOWER(")
            .push_bind(brand.to_owned())
            .push(")");
    }
    if let Some(min) = filter.min_price {
        condition(query, &mut has_where)
            .push("price >= ")
            .push_bind(min);
    }
    if let Some(max) = filter.max_price {
        condition(query, &mut has_where)
            .push("price <= ")
            .push_bind(max);
    }
    match &filter.text {
        Some(TextMatch::FullText(tsquery)) => {
            condition(query, &mut has_where)
                .push("search @@ to_tsquery('english', ")
                .push_bind(tsquery.clone())
                .push(")");
        }
        Some(TextMatch::Regex(pattern)) => {
            let query = condition(query, &mut has_where);
            query.push("(");
            for (i, column) in ["name", "description", "category", "brand", "array_to_string(tags, ' ')"]
                .into_iter()
                .enumerate()
            {
                if i > 0 {
                    query.push(" OR ");
                }
                query.push(column).push(" ~* ").push_bind(pattern.clone());
            }
            query.push(")");
        }
        None => {}
    }
}

/// Push `WHERE` before the first condition and `AND` before the rest.
fn condition<'q, 'b>(
    query: &'b mut QueryBuilder<'q, Postgres>,
    has_where: &mut bool,
) -> &'b mut QueryBuilder<'q, Postgres> {
    query.push(if *has_where { " AND " } else { " WHERE " });
    *has_where = true;
    query
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn where_sql(filter: &ProductFilter) -> String {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM shop.product");
        push_where(&mut query, filter);
        query.sql().to_owned()
    }

    #[test]
    fn test_default_filter_only_active() {
        assert_eq!(
            where_sql(&ProductFilter::default()),
            "SELECT 1 FROM shop.product WHERE is_active"
        );
    }

    #[test]
    fn test_admin_filter_has_no_where() {
        let filter = ProductFilter {
            include_inactive: true,
            ..ProductFilter::default()
        };
        assert_eq!(where_sql(&filter), "SELECT 1 FROM shop.product");
    }

    #[test]
    fn test_filters_are_and_joined_with_binds() {
        let filter = ProductFilter {
            category: Some("Shoes".to_owned()),
            brand: Some("  ".to_owned()),
            min_price: Some(Decimal::new(10, 0)),
            max_price: Some(Decimal::new(50, 0)),
            ..ProductFilter::default()
        };
        assert_eq!(
            where_sql(&filter),
            "SELECT 1 FROM shop.product WHERE is_active AND LOWER(category) = LOWER($1) \
             AND price >= $2 AND price <= $3"
        );
    }

    #[test]
    fn test_full_text_clause() {
        let filter = ProductFilter {
            text: Some(TextMatch::FullText("wool:*".to_owned())),
            ..ProductFilter::default()
        };
        assert!(where_sql(&filter).ends_with("AND search @@ to_tsquery('english', $1)"));
    }

    #[test]
    fn test_regex_clause_covers_text_columns() {
        let filter = ProductFilter {
            text: Some(TextMatch::Regex("wool|sock".to_owned())),
            ..ProductFilter::default()
        };
        let sql = where_sql(&filter);
        for column in ["name ~*", "description ~*", "category ~*", "brand ~*", "tags, ' ') ~*"] {
            assert!(sql.contains(column), "{column} missing from {sql}");
        }
    }
}
