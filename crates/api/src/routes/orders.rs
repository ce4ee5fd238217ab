//! Checkout and order history route handlers.
//!
//! All routes require a signed-in user. Orders belonging to someone else are
//! reported as missing rather than forbidden.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;

use shopfront_core::{OrderId, OrderStatus};

use crate::db::users::UserRepository;
use crate::db::{CartOwner, NewOrder, OrderRepository};
use crate::error::{AppError, Result};
use crate::middleware::{CurrentUser, RequireAuth};
use crate::models::{Order, Page, PageQuery, PaymentMethod, ShippingAddress};
use crate::routes::cart::load_available;
use crate::services::checkout::resolve_shipping_address;
use crate::state::AppState;

const MAX_REFERENCE_LENGTH: usize = 200;

/// Checkout request body.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: PaymentMethod,
}

/// Payment confirmation body.
#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub payment_reference: String,
}

fn not_found() -> AppError {
    AppError::NotFound("Order not found".to_owned())
}

/// Load an order the caller may see: their own, or any order for an admin.
async fn visible_order(state: &AppState, user: CurrentUser, id: OrderId) -> Result<Order> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|order| order.is_owned_by(user.id) || user.is_admin())
        .ok_or_else(not_found)
}

/// Load an order the caller owns.
async fn owned_order(state: &AppState, user: CurrentUser, id: OrderId) -> Result<Order> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|order| order.is_owned_by(user.id))
        .ok_or_else(not_found)
}

/// Place an order from the caller's cart.
///
/// # Route
///
/// `POST /api/orders`
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    payload: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>)> {
    let Json(req) = payload?;

    let profile = UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_owned()))?;
    let shipping_address =
        resolve_shipping_address(req.shipping_address, profile.shipping_address.as_ref())?;

    // Same pruning as the cart view, so a delisted line never blocks checkout
    let (cart, _) = load_available(&state, CartOwner::User(user.id)).await?;

    let new_order = NewOrder {
        user_id: user.id,
        shipping_address,
        payment_method: req.payment_method,
    };
    let order = OrderRepository::new(state.pool())
        .create(&new_order, &cart, &state.config().checkout)
        .await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.id,
        total = %order.totals.total,
        items = order.item_count(),
        "Order placed"
    );

    // Stock changed for every product in the order
    for item in &order.items {
        state.catalog().invalidate_product(item.product_id).await;
    }

    Ok((StatusCode::CREATED, Json(order)))
}

/// The caller's orders, newest first.
///
/// # Route
///
/// `GET /api/orders`
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Page<Order>>> {
    let Query(query) = query?;

    let orders = OrderRepository::new(state.pool())
        .list_by_user(user.id, query.into())
        .await?;
    Ok(Json(orders))
}

/// Order detail, for the owner or an admin.
///
/// # Route
///
/// `GET /api/orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    id: std::result::Result<Path<OrderId>, PathRejection>,
) -> Result<Json<Order>> {
    let Path(id) = id?;
    Ok(Json(visible_order(&state, user, id).await?))
}

/// Record payment for an order.
///
/// # Route
///
/// `POST /api/orders/{id}/pay`
pub async fn pay(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    id: std::result::Result<Path<OrderId>, PathRejection>,
    payload: std::result::Result<Json<PayRequest>, JsonRejection>,
) -> Result<Json<Order>> {
    let Path(id) = id?;
    let Json(req) = payload?;

    let reference = req.payment_reference.trim();
    if reference.is_empty() || reference.chars().count() > MAX_REFERENCE_LENGTH {
        return Err(AppError::Validation(format!(
            "payment_reference must be 1 to {MAX_REFERENCE_LENGTH} characters"
        )));
    }

    let order = owned_order(&state, user, id).await?;
    if !order.can_pay() {
        return Err(AppError::Conflict("Order cannot be paid".to_owned()));
    }

    let order = OrderRepository::new(state.pool())
        .mark_paid(order.id, reference)
        .await?;

    tracing::info!(order_id = %order.id, "Order paid");
    Ok(Json(order))
}

/// Cancel an order and return its items to stock.
///
/// # Route
///
/// `POST /api/orders/{id}/cancel`
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    id: std::result::Result<Path<OrderId>, PathRejection>,
) -> Result<Json<Order>> {
    let Path(id) = id?;

    let order = owned_order(&state, user, id).await?;
    if !order.status.can_transition_to(OrderStatus::Cancelled) {
        return Err(AppError::Conflict(format!(
            "Cannot cancel an order that is {}",
            order.status.as_str()
        )));
    }

    let order = OrderRepository::new(state.pool())
        .cancel(order.id, order.status)
        .await?;

    for item in &order.items {
        state.catalog().invalidate_product(item.product_id).await;
    }

    Ok(Json(order))
}
