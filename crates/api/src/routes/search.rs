//! Product search route handler.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;

use crate::error::Result;
use crate::models::Pagination;
use crate::search::{SearchResults, SearchService};
use crate::state::AppState;

/// Query parameters for search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Natural-language product search, e.g. `wool socks under $20`.
///
/// # Route
///
/// `GET /api/search?q=...`
pub async fn search(
    State(state): State<AppState>,
    query: std::result::Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<SearchResults>> {
    let Query(query) = query?;
    let pagination = Pagination::new(query.page, query.per_page);

    let results = SearchService::new(state.pool())
        .search(&query.q, pagination)
        .await?;
    Ok(Json(results))
}
