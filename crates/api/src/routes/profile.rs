//! Profile route handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;

use shopfront_core::Email;

use crate::db::RepositoryError;
use crate::db::users::{ProfileUpdate, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{ShippingAddress, User};
use crate::services::auth::validate_name;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Profile update body. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
}

/// Password change body.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: String,
}

/// The caller's profile.
///
/// # Route
///
/// `GET /api/profile`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<User>> {
    Ok(Json(AuthService::new(state.pool()).get_user(user.id).await?))
}

/// Update name, email or default shipping address.
///
/// # Route
///
/// `PUT /api/profile`
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    payload: std::result::Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<User>> {
    let Json(req) = payload?;

    let name = req.name.as_deref().map(validate_name).transpose()?;
    let email = req
        .email
        .as_deref()
        .map(Email::parse)
        .transpose()
        .map_err(AuthError::from)?;
    let shipping_address = req
        .shipping_address
        .map(ShippingAddress::normalized)
        .transpose()
        .map_err(AppError::Validation)?;

    let update = ProfileUpdate {
        name,
        email: email.as_ref(),
        shipping_address: shipping_address.as_ref(),
    };

    let updated = UserRepository::new(state.pool())
        .update_profile(user.id, &update)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists.into(),
            other => AppError::from(other),
        })?;

    tracing::info!(user_id = %user.id, "Profile updated");
    Ok(Json(updated))
}

/// Set or change the password.
///
/// # Route
///
/// `PUT /api/profile/password`
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    payload: std::result::Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let Json(req) = payload?;

    AuthService::new(state.pool())
        .change_password(user.id, req.current_password.as_deref(), &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
