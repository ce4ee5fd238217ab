//! Authentication service.
//!
//! Provides password registration, login, OAuth sign-in and password changes.
//! Sessions are stateless JWT cookies, see [`crate::services::jwt`].

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use shopfront_core::{Email, UserId, UserRole};

use crate::db::RepositoryError;
use crate::db::users::{OAuthIdentity, UserRepository};
use crate::models::User;
use crate::services::oauth::{PROVIDER, UserInfo};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Upper bound so hashing cost stays predictable.
const MAX_PASSWORD_LENGTH: usize = 128;

const MAX_NAME_LENGTH: usize = 100;

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new customer with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidName` if the name is empty or too long.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let name = validate_name(name)?;
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&email, name, Some(&password_hash), UserRole::Customer)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Change a user's password.
    ///
    /// The current password is required when one is set. Accounts created
    /// through OAuth may set their first password without it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the current password is missing or wrong.
    /// Returns `AuthError::WeakPassword` if the new password doesn't meet requirements.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current_password: Option<&str>,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_password(new_password)?;

        if let Some((_, existing_hash)) = self.users.get_password_hash_by_id(user_id).await? {
            let current = current_password.ok_or(AuthError::InvalidCredentials)?;
            verify_password(current, &existing_hash)?;
        } else if self.users.get_by_id(user_id).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }

        let password_hash = hash_password(new_password)?;
        self.users
            .update_password(user_id, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Sign in with an identity confirmed by the OAuth provider.
    ///
    /// Returns the linked account, links an existing account with the same
    /// verified email, or creates a new customer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the provider's email is malformed.
    /// Returns `AuthError::OAuthRejected` if the email belongs to an account
    /// that cannot be linked.
    pub async fn oauth_sign_in(&self, info: &UserInfo) -> Result<User, AuthError> {
        let email = Email::parse(&info.email)?;
        let fallback_name = email.local_part().to_owned();
        let name = info
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&fallback_name);

        let identity = OAuthIdentity {
            provider: PROVIDER,
            subject: &info.sub,
            email: &email,
            email_verified: info.email_verified,
            name,
        };

        let user = self
            .users
            .upsert_oauth(&identity)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) => AuthError::OAuthRejected(msg),
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, provider = PROVIDER, "OAuth sign-in");
        Ok(user)
    }
}

/// Trim a display name and check its length.
///
/// # Errors
///
/// Returns `AuthError::InvalidName` if the name is empty or longer than 100 characters.
pub fn validate_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::InvalidName("name is required".to_owned()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthError::InvalidName(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}

/// Check a password against the length rules.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` describing the failed rule.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the password doesn't match.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
