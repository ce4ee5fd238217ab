//! Product search.
//!
//! A query is parsed into terms and a price range, then run through a
//! fallback chain until something matches:
//!
//! 1. `browse` - no terms, only the price range applies
//! 2. `full_text` - weighted `tsvector` match ranked by `ts_rank`
//! 3. `regex` - case-insensitive match over the text columns
//! 4. `none` - nothing matched

mod query;

pub use query::{ParsedQuery, parse_query};

use serde::Serialize;
use sqlx::PgPool;

use crate::db::RepositoryError;
use crate::db::products::{ProductFilter, ProductRepository, TextMatch};
use crate::models::{Page, Pagination, Product, ProductSort};

/// Longest query we bother parsing.
pub const MAX_QUERY_LENGTH: usize = 200;

/// Which step of the chain produced the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Browse,
    FullText,
    Regex,
    None,
}

/// Search response body.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub query: String,
    #[serde(flatten)]
    pub parsed: ParsedQuery,
    pub strategy: Strategy,
    #[serde(flatten)]
    pub results: Page<Product>,
}

/// Runs parsed queries against the catalog.
pub struct SearchService<'a> {
    products: ProductRepository<'a>,
}

impl<'a> SearchService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            products: ProductRepository::new(pool),
        }
    }

    /// Search active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn search(
        &self,
        raw_query: &str,
        pagination: Pagination,
    ) -> Result<SearchResults, RepositoryError> {
        let query: String = raw_query.trim().chars().take(MAX_QUERY_LENGTH).collect();
        let parsed = parse_query(&query);

        let price_filter = ProductFilter {
            min_price: parsed.min_price,
            max_price: parsed.max_price,
            ..ProductFilter::default()
        };

        let (strategy, results) = if parsed.has_terms() {
            self.match_terms(&parsed, price_filter, pagination).await?
        } else {
            let page = self
                .products
                .list(&price_filter, ProductSort::Newest, pagination)
                .await?;
            (Strategy::Browse, page)
        };

        tracing::debug!(
            query = %query,
            terms = ?parsed.terms,
            strategy = ?strategy,
            total = results.total,
            "Search completed"
        );

        Ok(SearchResults {
            query,
            parsed,
            strategy,
            results,
        })
    }

    async fn match_terms(
        &self,
        parsed: &ParsedQuery,
        price_filter: ProductFilter,
        pagination: Pagination,
    ) -> Result<(Strategy, Page<Product>), RepositoryError> {
        let full_text = ProductFilter {
            text: Some(TextMatch::FullText(parsed.tsquery())),
            ..price_filter.clone()
        };
        let page = self
            .products
            .list(&full_text, ProductSort::Newest, pagination)
            .await?;
        if page.total > 0 {
            return Ok((Strategy::FullText, page));
        }

        let regex = ProductFilter {
            text: Some(TextMatch::Regex(parsed.regex_pattern())),
            ..price_filter
        };
        let page = self
            .products
            .list(&regex, ProductSort::Newest, pagination)
            .await?;
        if page.total > 0 {
            return Ok((Strategy::Regex, page));
        }

        Ok((Strategy::None, Page::empty(pagination)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_results_serialize_flat() {
        let results = SearchResults {
            query: "socks under $10".to_owned(),
            parsed: parse_query("socks under $10"),
            strategy: Strategy::FullText,
            results: Page::empty(Pagination::default()),
        };
        let json = serde_json::to_value(&results).unwrap();

        assert_eq!(json["strategy"], "full_text");
        assert_eq!(json["terms"][0], "socks");
        assert_eq!(json["max_price"], "10");
        assert!(json["min_price"].is_null());
        assert_eq!(json["total"], 0);
        assert_eq!(json["per_page"], 12);
    }
}
