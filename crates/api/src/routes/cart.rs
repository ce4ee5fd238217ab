//! Cart route handlers.
//!
//! The cart belongs to the signed-in user, or else to the guest cookie. A
//! guest cookie is issued on the first write.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shopfront_core::{ProductId, round_money};

use crate::db::products::ProductRepository;
use crate::db::{CartOwner, CartRepository};
use crate::error::{AppError, Result};
use crate::middleware::{CurrentUser, OptionalAuth, guest_cookie, guest_token};
use crate::models::{CartDocument, Product};
use crate::state::AppState;

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Set-quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

/// A cart line with its product joined in.
#[derive(Debug, Serialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
    pub line_total: Decimal,
    pub added_at: DateTime<Utc>,
}

/// Cart response body.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub item_count: u32,
    pub subtotal: Decimal,
}

impl CartView {
    /// Join `cart` with `products`, skipping lines whose product is gone or inactive.
    #[must_use]
    pub fn build(cart: &CartDocument, products: &[Product]) -> Self {
        let items: Vec<CartLine> = cart
            .items()
            .iter()
            .filter_map(|line| {
                let product = products
                    .iter()
                    .find(|p| p.id == line.product_id && p.is_active)?;
                Some(CartLine {
                    product: product.clone(),
                    quantity: line.quantity,
                    line_total: round_money(product.price * Decimal::from(line.quantity)),
                    added_at: line.added_at,
                })
            })
            .collect();

        Self {
            item_count: items.iter().map(|l| l.quantity).sum(),
            subtotal: round_money(items.iter().map(|l| l.line_total).sum()),
            items,
        }
    }
}

/// The owner of an existing cart, if the visitor has one.
fn current_owner(user: Option<CurrentUser>, jar: &CookieJar) -> Option<CartOwner> {
    user.map(|u| CartOwner::User(u.id))
        .or_else(|| guest_token(jar).map(CartOwner::Guest))
}

/// The owner to write to, issuing a guest cookie when the visitor has none.
fn writable_owner(
    state: &AppState,
    user: Option<CurrentUser>,
    jar: CookieJar,
) -> (CartOwner, CookieJar) {
    if let Some(owner) = current_owner(user, &jar) {
        return (owner, jar);
    }

    let token = Uuid::new_v4();
    tracing::debug!(guest = %token, "Issuing guest cart token");
    let jar = jar.add(guest_cookie(token, state.config().secure_cookies()));
    (CartOwner::Guest(token), jar)
}

/// Load the owner's cart and the products it references.
///
/// Lines whose product is gone or inactive are dropped and the pruned cart
/// is saved, so what the cart shows is what checkout will price.
pub(crate) async fn load_available(
    state: &AppState,
    owner: CartOwner,
) -> Result<(CartDocument, Vec<Product>)> {
    let carts = CartRepository::new(state.pool());
    let mut cart = carts.load(owner).await?;
    if cart.is_empty() {
        return Ok((cart, Vec::new()));
    }

    let ids: Vec<ProductId> = cart.items().iter().map(|i| i.product_id).collect();
    let products = ProductRepository::new(state.pool()).get_many(&ids).await?;

    let dropped = cart.retain(|line| {
        products
            .iter()
            .any(|p| p.id == line.product_id && p.is_active)
    });
    if dropped > 0 {
        tracing::info!(?owner, dropped, "Dropped unavailable cart lines");
        carts.save(owner, &cart).await?;
    }

    Ok((cart, products))
}

/// Load the products referenced by `cart` and build the response.
async fn view(state: &AppState, cart: &CartDocument) -> Result<CartView> {
    let ids: Vec<ProductId> = cart.items().iter().map(|i| i.product_id).collect();
    let products = ProductRepository::new(state.pool()).get_many(&ids).await?;
    Ok(CartView::build(cart, &products))
}

/// An active product, or 404.
async fn active_product(state: &AppState, id: ProductId) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get_active(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))
}

/// The visitor's cart.
///
/// # Route
///
/// `GET /api/cart`
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    jar: CookieJar,
) -> Result<Json<CartView>> {
    let Some(owner) = current_owner(user, &jar) else {
        return Ok(Json(CartView::build(&CartDocument::default(), &[])));
    };

    let (cart, products) = load_available(&state, owner).await?;
    Ok(Json(CartView::build(&cart, &products)))
}

/// Add a product to the cart.
///
/// # Route
///
/// `POST /api/cart/items`
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    jar: CookieJar,
    payload: std::result::Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload?;
    let product = active_product(&state, req.product_id).await?;

    let (owner, jar) = writable_owner(&state, user, jar);
    let (mut cart, _) = load_available(&state, owner).await?;
    let quantity = cart.add(product.id, req.quantity, product.stock, Utc::now())?;
    CartRepository::new(state.pool()).save(owner, &cart).await?;

    tracing::debug!(product_id = %product.id, quantity, "Added to cart");
    Ok((jar, Json(view(&state, &cart).await?)))
}

/// Set a line's quantity. Zero removes the line.
///
/// # Route
///
/// `PATCH /api/cart/items/{product_id}`
pub async fn update(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    jar: CookieJar,
    product_id: std::result::Result<Path<ProductId>, PathRejection>,
    payload: std::result::Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Json<CartView>> {
    let Path(product_id) = product_id?;
    let Json(req) = payload?;

    let owner = current_owner(user, &jar)
        .ok_or_else(|| AppError::NotFound("product is not in the cart".to_owned()))?;
    let (mut cart, _) = load_available(&state, owner).await?;

    let stock = if req.quantity == 0 {
        0
    } else {
        active_product(&state, product_id).await?.stock
    };
    cart.set_quantity(product_id, req.quantity, stock)?;
    CartRepository::new(state.pool()).save(owner, &cart).await?;

    Ok(Json(view(&state, &cart).await?))
}

/// Remove a line. Removing a missing line is not an error.
///
/// # Route
///
/// `DELETE /api/cart/items/{product_id}`
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    jar: CookieJar,
    product_id: std::result::Result<Path<ProductId>, PathRejection>,
) -> Result<Json<CartView>> {
    let Path(product_id) = product_id?;

    let Some(owner) = current_owner(user, &jar) else {
        return Ok(Json(CartView::build(&CartDocument::default(), &[])));
    };
    let (mut cart, _) = load_available(&state, owner).await?;
    if cart.remove(product_id) {
        CartRepository::new(state.pool()).save(owner, &cart).await?;
    }

    Ok(Json(view(&state, &cart).await?))
}

/// Empty the cart.
///
/// # Route
///
/// `DELETE /api/cart`
pub async fn clear(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    jar: CookieJar,
) -> Result<StatusCode> {
    if let Some(owner) = current_owner(user, &jar) {
        CartRepository::new(state.pool()).delete(owner).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
