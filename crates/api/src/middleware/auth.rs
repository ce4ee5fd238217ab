//! Authentication extractors.
//!
//! The session is a JWT in the `shop_token` cookie. A valid signature is not
//! enough: every extractor also looks the account up, so deleting a user or
//! changing their role takes effect on their next request rather than when
//! the token expires.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn handler(RequireAuth(user): RequireAuth) -> Result<Json<Order>> {
//!     // user.id, user.role
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;

use shopfront_core::{UserId, UserRole};

use crate::db::users::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::services::jwt::AUTH_COOKIE_NAME;
use crate::state::AppState;

/// The signed-in user, with the role currently on their account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Read and verify the session cookie. No database access.
fn session_claims(parts: &Parts, state: &AppState) -> Option<CurrentUser> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar.get(AUTH_COOKIE_NAME)?;

    let claims = state
        .jwt()
        .verify(token.value())
        .inspect_err(|e| tracing::debug!(error = %e, "Rejected session token"))
        .ok()?;

    Some(CurrentUser {
        id: claims.user_id()?,
        role: claims.role,
    })
}

/// The session user with their current role, or `None` when there is no
/// valid session or the account has been deleted.
async fn current_user(
    claimed: CurrentUser,
    state: &AppState,
) -> Result<Option<CurrentUser>, AppError> {
    let Some(role) = UserRepository::new(state.pool())
        .get_role(claimed.id)
        .await?
    else {
        tracing::info!(user_id = %claimed.id, "Session for deleted account");
        return Ok(None);
    };

    if role != claimed.role {
        tracing::debug!(
            user_id = %claimed.id,
            claimed = %claimed.role,
            current = %role,
            "Role changed since sign-in"
        );
    }

    let user = CurrentUser {
        id: claimed.id,
        role,
    };
    set_sentry_user(&user.id);
    Ok(Some(user))
}

fn unauthorized() -> AppError {
    AppError::Unauthorized("Authentication required".to_owned())
}

/// Extractor that requires a signed-in user. Rejects with 401.
pub struct RequireAuth(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claimed = session_claims(parts, state).ok_or_else(unauthorized)?;
        current_user(claimed, state)
            .await?
            .map(Self)
            .ok_or_else(unauthorized)
    }
}

/// Extractor that optionally gets the signed-in user. A missing, invalid or
/// orphaned session is treated as a guest.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(claimed) = session_claims(parts, state) else {
            return Ok(Self(None));
        };
        Ok(Self(current_user(claimed, state).await?))
    }
}

/// Extractor that requires an admin. Rejects with 401 when signed out and 403
/// for everyone else.
///
/// Both the token and the account must say admin. A customer token is
/// refused without a lookup; a promoted user signs in again to pick up the
/// role.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claimed = session_claims(parts, state).ok_or_else(unauthorized)?;
        if !claimed.is_admin() {
            return Err(forbidden());
        }

        let user = current_user(claimed, state)
            .await?
            .ok_or_else(unauthorized)?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, "Demoted admin token refused");
            return Err(forbidden());
        }

        Ok(Self(user))
    }
}

fn forbidden() -> AppError {
    AppError::Forbidden("Admin access required".to_owned())
}
