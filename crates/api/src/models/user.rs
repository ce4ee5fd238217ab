//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shopfront_core::{Email, UserId, UserRole};

use super::ShippingAddress;

/// A shop account (domain type).
///
/// Never carries the password hash; see `UserRepository::get_with_password_hash`.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalized email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Account role.
    pub role: UserRole,
    /// Whether a password is set (OAuth-only accounts have none).
    pub has_password: bool,
    /// OAuth provider the account is linked to, if any.
    pub oauth_provider: Option<String>,
    /// Default shipping address.
    pub shipping_address: Option<ShippingAddress>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
