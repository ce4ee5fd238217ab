//! Pagination for list endpoints.

use serde::{Deserialize, Serialize};

/// Requested page, 1-based, with a clamped page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub const DEFAULT_PER_PAGE: u32 = 12;
    pub const MAX_PER_PAGE: u32 = 48;

    /// Build from optional query parameters. Missing or zero values fall back to defaults.
    #[must_use]
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            per_page: per_page
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.per_page as i64
    }

    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Page/per-page query parameters shared by list endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl From<PageQuery> for Pagination {
    fn from(query: PageQuery) -> Self {
        Self::new(query.page, query.per_page)
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, pagination: Pagination, total: i64) -> Self {
        let per_page = i64::from(pagination.per_page);
        Self {
            items,
            page: pagination.page,
            per_page: pagination.per_page,
            total,
            total_pages: (total + per_page - 1) / per_page,
        }
    }

    #[must_use]
    pub fn empty(pagination: Pagination) -> Self {
        Self::new(Vec::new(), pagination, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_clamping() {
        assert_eq!(Pagination::new(None, None), Pagination { page: 1, per_page: 12 });
        assert_eq!(Pagination::new(Some(0), Some(0)).per_page, 1);
        assert_eq!(Pagination::new(Some(0), Some(0)).page, 1);
        assert_eq!(Pagination::new(Some(3), Some(500)).per_page, 48);
    }

    #[test]
    fn test_offset() {
        assert_eq!(Pagination::new(Some(1), Some(12)).offset(), 0);
        assert_eq!(Pagination::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let pagination = Pagination::new(Some(1), Some(12));
        assert_eq!(Page::<()>::new(Vec::new(), pagination, 0).total_pages, 0);
        assert_eq!(Page::<()>::new(Vec::new(), pagination, 12).total_pages, 1);
        assert_eq!(Page::<()>::new(Vec::new(), pagination, 13).total_pages, 2);
    }
}
