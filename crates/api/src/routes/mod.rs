//! HTTP route handlers for the shop API.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (rate limited, except /me)
//! POST   /api/auth/register              - Create an account and sign in
//! POST   /api/auth/login                 - Sign in with email and password
//! POST   /api/auth/logout                - Clear the session cookie
//! GET    /api/auth/me                    - Current user
//!
//! # OAuth (404 unless configured)
//! GET    /api/auth/oauth/google          - Redirect to the provider
//! GET    /api/auth/oauth/google/callback - Handle the provider callback
//!
//! # Catalog
//! GET    /api/products                   - Active product listing
//! GET    /api/products/categories        - Categories with counts
//! GET    /api/products/{id}              - Product detail
//! GET    /api/search                     - Natural-language product search
//!
//! # Cart (user or guest)
//! GET    /api/cart                       - Cart with product details
//! DELETE /api/cart                       - Empty the cart
//! POST   /api/cart/items                 - Add a product
//! PATCH  /api/cart/items/{product_id}    - Set a line's quantity
//! DELETE /api/cart/items/{product_id}    - Remove a line
//!
//! # Orders (requires auth)
//! POST   /api/orders                     - Check out the cart
//! GET    /api/orders                     - Order history
//! GET    /api/orders/{id}                - Order detail
//! POST   /api/orders/{id}/pay            - Record payment
//! POST   /api/orders/{id}/cancel         - Cancel and restock
//!
//! # Profile (requires auth)
//! GET    /api/profile                    - Profile
//! PUT    /api/profile                    - Update name, email, address
//! PUT    /api/profile/password           - Set or change password
//!
//! # Admin (requires admin)
//! GET    /api/admin/dashboard            - Counts, revenue, recent orders
//! GET    /api/admin/products             - All products
//! POST   /api/admin/products             - Create product
//! PUT    /api/admin/products/{id}        - Update product
//! DELETE /api/admin/products/{id}        - Delete product
//! GET    /api/admin/orders               - All orders, filterable by status
//! PATCH  /api/admin/orders/{id}/status   - Move an order along its lifecycle
//! GET    /api/admin/users                - All users
//! PATCH  /api/admin/users/{id}/role      - Change a user's role
//! DELETE /api/admin/users/{id}           - Delete a user
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod oauth;
pub mod orders;
pub mod products;
pub mod profile;
pub mod search;

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/oauth/google", get(oauth::login))
        .route("/oauth/google/callback", get(oauth::callback))
        .layer(auth_rate_limiter())
        // Outside the limiter
        .route("/me", get(auth::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/categories", get(products::categories))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route(
            "/items/{product_id}",
            patch(cart::update).delete(cart::remove),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/{id}", get(orders::show))
        .route("/{id}/pay", post(orders::pay))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the profile routes router.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(profile::show).put(profile::update))
        .route("/password", put(profile::change_password))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route(
            "/products",
            get(admin::list_products).post(admin::create_product),
        )
        .route(
            "/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route("/orders", get(admin::list_orders))
        .route("/orders/{id}/status", patch(admin::update_order_status))
        .route("/users", get(admin::list_users))
        .route("/users/{id}", axum::routing::delete(admin::delete_user))
        .route("/users/{id}/role", patch(admin::update_user_role))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .route("/search", get(search::search))
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/profile", profile_routes())
        .nest("/admin", admin_routes())
}
