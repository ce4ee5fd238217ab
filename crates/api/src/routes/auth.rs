//! Password authentication route handlers.
//!
//! A successful sign-in sets the JWT session cookie and folds any guest cart
//! into the user's cart.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::db::carts::CartRepository;
use crate::error::Result;
use crate::middleware::{RequireAuth, guest_removal_cookie, guest_token};
use crate::models::User;
use crate::services::jwt::removal_cookie;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issue the session cookie for `user` and adopt the guest cart, if any.
///
/// A failed cart merge is logged and never blocks the sign-in.
pub(crate) async fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
) -> Result<CookieJar> {
    let token = state
        .jwt()
        .issue(user.id, user.role)
        .map_err(AuthError::from)?;
    let jar = jar.add(state.jwt().cookie(token, state.config().secure_cookies()));

    let Some(guest) = guest_token(&jar) else {
        return Ok(jar);
    };

    match CartRepository::new(state.pool())
        .merge_guest_into_user(guest, user.id)
        .await
    {
        Ok(merged) => {
            if let Some(cart) = merged {
                tracing::info!(
                    user_id = %user.id,
                    items = cart.item_count(),
                    "Merged guest cart"
                );
            }
        }
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to merge guest cart");
        }
    }

    Ok(jar.remove(guest_removal_cookie()))
}

/// Create an account and sign in.
///
/// # Route
///
/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload?;

    let user = AuthService::new(state.pool())
        .register(&req.name, &req.email, &req.password)
        .await?;
    let jar = start_session(&state, jar, &user).await?;

    Ok((StatusCode::CREATED, jar, Json(user)))
}

/// Sign in with email and password.
///
/// # Route
///
/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload?;

    let user = AuthService::new(state.pool())
        .login(&req.email, &req.password)
        .await
        .inspect_err(|e| {
            if matches!(e, AuthError::InvalidCredentials) {
                tracing::info!("Failed login attempt");
            }
        })?;
    let jar = start_session(&state, jar, &user).await?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok((jar, Json(user)))
}

/// Clear the session cookie.
///
/// # Route
///
/// `POST /api/auth/logout`
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (StatusCode::NO_CONTENT, jar.remove(removal_cookie()))
}

/// The signed-in user.
///
/// # Route
///
/// `GET /api/auth/me`
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;
    Ok(Json(user))
}
