//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use shopfront_core::{Email, UserId, UserRole};

use super::RepositoryError;
use crate::models::{Pagination, ShippingAddress, User};

const USER_COLUMNS: &str = "id, email, name, password_hash, role, oauth_provider, \
                            shipping_address, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    name: String,
    password_hash: Option<String>,
    role: UserRole,
    oauth_provider: Option<String>,
    shipping_address: Option<Json<ShippingAddress>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<(User, Option<String>), RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let user = User {
            id: self.id,
            email,
            name: self.name,
            role: self.role,
            has_password: self.password_hash.is_some(),
            oauth_provider: self.oauth_provider,
            shipping_address: self.shipping_address.map(|Json(a)| a),
            created_at: self.created_at,
            updated_at: self.updated_at,
        };

        Ok((user, self.password_hash))
    }
}

fn into_user(row: UserRow) -> Result<User, RepositoryError> {
    row.into_user().map(|(user, _)| user)
}

/// Fields a user may change on their own profile. `None` leaves a field as is.
#[derive(Debug, Default)]
pub struct ProfileUpdate<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a Email>,
    pub shipping_address: Option<&'a ShippingAddress>,
}

/// Identity returned by an OAuth provider.
#[derive(Debug)]
pub struct OAuthIdentity<'a> {
    pub provider: &'a str,
    pub subject: &'a str,
    pub email: &'a Email,
    pub email_verified: bool,
    pub name: &'a str,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM shop.user WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(into_user)
            .transpose()
    }

    /// Current role of a user, or `None` if the account no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_role(&self, id: UserId) -> Result<Option<UserRole>, RepositoryError> {
        let role = sqlx::query_scalar::<_, UserRole>("SELECT role FROM shop.user WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(role)
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM shop.user WHERE email = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?
            .map(into_user)
            .transpose()
    }

    /// Get a user together with their password hash.
    ///
    /// Returns `None` if the user doesn't exist or has no password set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM shop.user WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Self::with_hash(row)
    }

    /// Same as [`Self::get_with_password_hash`], keyed by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash_by_id(
        &self,
        id: UserId,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM shop.user WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Self::with_hash(row)
    }

    fn with_hash(row: Option<UserRow>) -> Result<Option<(User, String)>, RepositoryError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let (user, hash) = row.into_user()?;
        Ok(hash.map(|h| (user, h)))
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: Option<&str>,
        role: UserRole,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO shop.user (email, name, password_hash, role) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .bind(name)
            .bind(password_hash)
            .bind(role)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "email already exists"))?;

        into_user(row)
    }

    /// Find or create the account for an OAuth identity.
    ///
    /// Lookup order:
    /// 1. An account already linked to `(provider, subject)`.
    /// 2. An account with the same email, if the provider verified it. The
    ///    identity is linked to that account.
    /// 3. A new customer account without a password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` when the email belongs to an
    /// account that cannot be linked (unverified email, or already linked to
    /// another identity).
    pub async fn upsert_oauth(&self, identity: &OAuthIdentity<'_>) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM shop.user \
             WHERE oauth_provider = $1 AND oauth_subject = $2"
        );
        let linked = sqlx::query_as::<_, UserRow>(&sql)
            .bind(identity.provider)
            .bind(identity.subject)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(row) = linked {
            tx.commit().await?;
            return into_user(row);
        }

        let sql = format!(
            "SELECT {USER_COLUMNS}, oauth_subject IS NOT NULL AS linked \
             FROM shop.user WHERE email = $1 FOR UPDATE"
        );
        let existing: Option<(UserRow, bool)> = sqlx::query_as::<_, LinkCandidate>(&sql)
            .bind(identity.email)
            .fetch_optional(&mut *tx)
            .await?
            .map(|c| (c.user, c.linked));

        let row = match existing {
            Some((_, true)) => {
                return Err(RepositoryError::Conflict(
                    "email is linked to another sign-in identity".to_owned(),
                ));
            }
            Some(_) if !identity.email_verified => {
                return Err(RepositoryError::Conflict(
                    "email is registered but not verified by the provider".to_owned(),
                ));
            }
            Some((row, false)) => {
                let sql = format!(
                    "UPDATE shop.user SET oauth_provider = $1, oauth_subject = $2 \
                     WHERE id = $3 RETURNING {USER_COLUMNS}"
                );
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(identity.provider)
                    .bind(identity.subject)
                    .bind(row.id)
                    .fetch_one(&mut *tx)
                    .await?
            }
            None => {
                let sql = format!(
                    "INSERT INTO shop.user (email, name, oauth_provider, oauth_subject) \
                     VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
                );
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(identity.email)
                    .bind(identity.name)
                    .bind(identity.provider)
                    .bind(identity.subject)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| RepositoryError::from_unique(e, "account already exists"))?
            }
        };

        tx.commit().await?;
        into_user(row)
    }

    /// Update profile fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new email is taken.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate<'_>,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            "UPDATE shop.user SET \
                 name = COALESCE($2, name), \
                 email = COALESCE($3, email), \
                 shipping_address = COALESCE($4, shipping_address) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(update.name)
            .bind(update.email)
            .bind(update.shipping_address.map(Json))
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "email already exists"))?
            .ok_or(RepositoryError::NotFound)?;

        into_user(row)
    }

    /// Replace the password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE shop.user SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// List users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, pagination: Pagination) -> Result<Vec<User>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM shop.user \
             ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(into_user)
            .collect()
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_role(&self, id: UserId, role: UserRole) -> Result<User, RepositoryError> {
        let sql = format!("UPDATE shop.user SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(role)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        into_user(row)
    }

    /// Delete a user. Their cart goes with them; orders keep a null owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.user WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Total number of users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop.user")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[derive(sqlx::FromRow)]
struct LinkCandidate {
    #[sqlx(flatten)]
    user: UserRow,
    linked: bool,
}
