//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! shop-cli admin create -e admin@example.com -n "Admin Name" -p 'a long password'
//! ```
//!
//! Running the command again for an existing email promotes that account to
//! admin and leaves its password alone.
//!
//! # Environment Variables
//!
//! - `SHOP_DATABASE_URL` - `PostgreSQL` connection string

use thiserror::Error;

use shopfront_api::db::RepositoryError;
use shopfront_api::db::users::UserRepository;
use shopfront_api::services::auth::{
    AuthError, hash_password, validate_name, validate_password,
};
use shopfront_core::{Email, UserId, UserRole};

use super::{CommandError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Invalid input: {0}")]
    Invalid(#[from] AuthError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] shopfront_core::EmailError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create an admin user, or promote the existing user with this email.
///
/// # Returns
///
/// The ID of the admin user.
///
/// # Errors
///
/// Returns `AdminError` for invalid input or database failures.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<UserId, AdminError> {
    // Validate everything before touching the database
    let email = Email::parse(email)?;
    let name = validate_name(name)?;
    validate_password(password)?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    if let Some(existing) = users.get_by_email(&email).await? {
        if existing.is_admin() {
            tracing::info!(user_id = %existing.id, email = %email, "User is already an admin");
            return Ok(existing.id);
        }

        let user = users.set_role(existing.id, UserRole::Admin).await?;
        tracing::info!(user_id = %user.id, email = %email, "Existing user promoted to admin");
        return Ok(user.id);
    }

    let password_hash = hash_password(password)?;
    let user = users
        .create(&email, name, Some(&password_hash), UserRole::Admin)
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        email
    );
    Ok(user.id)
}
