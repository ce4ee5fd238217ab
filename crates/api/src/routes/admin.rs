//! Admin dashboard route handlers.
//!
//! Every handler takes [`RequireAdmin`], so signed-out callers get 401 and
//! customers get 403.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use shopfront_core::{OrderId, OrderStatus, ProductId, UserId, UserRole};

use crate::db::orders::OrderStats;
use crate::db::products::ProductRepository;
use crate::db::users::UserRepository;
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Order, Page, PageQuery, Pagination, Product, ProductInput, User};
use crate::routes::products::ProductQuery;
use crate::state::AppState;

/// Stock level at or below which a product is flagged on the dashboard.
const LOW_STOCK_THRESHOLD: i32 = 5;

/// Number of recent orders shown on the dashboard.
const RECENT_ORDERS: i64 = 5;

/// Dashboard response body.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub user_count: i64,
    pub product_count: i64,
    #[serde(flatten)]
    pub orders: OrderStats,
    pub low_stock: Vec<Product>,
}

/// Query parameters for the order list.
#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Order status change body.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// Role change body.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

// =============================================================================
// Dashboard
// =============================================================================

/// Store overview.
///
/// # Route
///
/// `GET /api/admin/dashboard`
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Dashboard>> {
    let pool = state.pool();
    let users = UserRepository::new(pool);
    let products = ProductRepository::new(pool);
    let orders = OrderRepository::new(pool);

    let (user_count, product_count, orders, low_stock) = tokio::try_join!(
        users.count(),
        products.count(),
        orders.stats(RECENT_ORDERS),
        products.low_stock(LOW_STOCK_THRESHOLD),
    )?;

    Ok(Json(Dashboard {
        user_count,
        product_count,
        orders,
        low_stock,
    }))
}

// =============================================================================
// Products
// =============================================================================

/// All products, including inactive ones.
///
/// # Route
///
/// `GET /api/admin/products`
pub async fn list_products(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    query: std::result::Result<Query<ProductQuery>, QueryRejection>,
) -> Result<Json<Page<Product>>> {
    let Query(query) = query?;
    let filter = query.filter(true)?;

    let page = ProductRepository::new(state.pool())
        .list(&filter, query.sort, query.pagination())
        .await?;
    Ok(Json(page))
}

/// Create a product.
///
/// # Route
///
/// `POST /api/admin/products`
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>)> {
    let Json(input) = payload?;
    let input = input.validated().map_err(AppError::Validation)?;

    let product = ProductRepository::new(state.pool()).create(&input).await?;
    state.catalog().invalidate_product(product.id).await;

    tracing::info!(admin_id = %admin.id, product_id = %product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's editable fields.
///
/// # Route
///
/// `PUT /api/admin/products/{id}`
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    id: std::result::Result<Path<ProductId>, PathRejection>,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<Product>> {
    let Path(id) = id?;
    let Json(input) = payload?;
    let input = input.validated().map_err(AppError::Validation)?;

    let product = ProductRepository::new(state.pool())
        .update(id, &input)
        .await?;
    state.catalog().invalidate_product(id).await;

    tracing::info!(admin_id = %admin.id, product_id = %id, "Product updated");
    Ok(Json(product))
}

/// Delete a product.
///
/// # Route
///
/// `DELETE /api/admin/products/{id}`
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    id: std::result::Result<Path<ProductId>, PathRejection>,
) -> Result<StatusCode> {
    let Path(id) = id?;

    ProductRepository::new(state.pool()).delete(id).await?;
    state.catalog().invalidate_product(id).await;

    tracing::info!(admin_id = %admin.id, product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Orders
// =============================================================================

/// All orders, newest first, optionally by status.
///
/// # Route
///
/// `GET /api/admin/orders?status=`
pub async fn list_orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    query: std::result::Result<Query<OrderListQuery>, QueryRejection>,
) -> Result<Json<Page<Order>>> {
    let Query(query) = query?;

    let page = OrderRepository::new(state.pool())
        .list(query.status, Pagination::new(query.page, query.per_page))
        .await?;
    Ok(Json(page))
}

/// Move an order to a new status.
///
/// # Route
///
/// `PATCH /api/admin/orders/{id}/status`
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    id: std::result::Result<Path<OrderId>, PathRejection>,
    payload: std::result::Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Order>> {
    let Path(id) = id?;
    let Json(req) = payload?;

    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_owned()))?;

    if !order.status.can_transition_to(req.status) {
        return Err(AppError::Conflict(format!(
            "Cannot move an order from {} to {}",
            order.status.as_str(),
            req.status.as_str()
        )));
    }

    let order = orders.update_status(id, order.status, req.status).await?;

    if req.status == OrderStatus::Cancelled {
        for item in &order.items {
            state.catalog().invalidate_product(item.product_id).await;
        }
    }

    tracing::info!(admin_id = %admin.id, order_id = %id, status = %req.status, "Order status updated by admin");
    Ok(Json(order))
}

// =============================================================================
// Users
// =============================================================================

/// All users, newest first.
///
/// # Route
///
/// `GET /api/admin/users`
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Page<User>>> {
    let Query(query) = query?;
    let pagination = Pagination::from(query);
    let users = UserRepository::new(state.pool());

    let (items, total) = tokio::try_join!(users.list(pagination), users.count())?;
    Ok(Json(Page::new(items, pagination, total)))
}

/// Change a user's role. Admins cannot demote themselves.
///
/// # Route
///
/// `PATCH /api/admin/users/{id}/role`
pub async fn update_user_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    id: std::result::Result<Path<UserId>, PathRejection>,
    payload: std::result::Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> Result<Json<User>> {
    let Path(id) = id?;
    let Json(req) = payload?;

    if id == admin.id && !req.role.is_admin() {
        return Err(AppError::Conflict("You cannot demote yourself".to_owned()));
    }

    let user = UserRepository::new(state.pool()).set_role(id, req.role).await?;

    tracing::info!(admin_id = %admin.id, user_id = %id, role = %req.role, "User role changed");
    Ok(Json(user))
}

/// Delete a user. Admins cannot delete themselves.
///
/// # Route
///
/// `DELETE /api/admin/users/{id}`
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    id: std::result::Result<Path<UserId>, PathRejection>,
) -> Result<StatusCode> {
    let Path(id) = id?;

    if id == admin.id {
        return Err(AppError::Conflict("You cannot delete yourself".to_owned()));
    }

    UserRepository::new(state.pool()).delete(id).await?;

    tracing::info!(admin_id = %admin.id, user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
