//! JWT session tokens and the cookie that carries them.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use shopfront_core::{UserId, UserRole};

use crate::config::JwtConfig;

/// Cookie holding the session JWT.
pub const AUTH_COOKIE_NAME: &str = "shop_token";

/// JWT claims payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub role: UserRole,
    /// Issued at (seconds since the epoch)
    pub iat: i64,
    /// Expiration (seconds since the epoch)
    pub exp: i64,
}

impl Claims {
    /// The user ID in `sub`, if it is one.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.sub.parse().ok()
    }
}

/// Signing and verification keys plus the token lifetime.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::hours(config.ttl_hours),
        }
    }

    /// Token lifetime, also used as the cookie `Max-Age`.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `user_id` valid from now for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns the `jsonwebtoken` error if encoding fails.
    pub fn issue(
        &self,
        user_id: UserId,
        role: UserRole,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now,
            exp: now + self.ttl.num_seconds(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
    }

    /// Check the signature and expiry and return the claims.
    ///
    /// # Errors
    ///
    /// Returns the `jsonwebtoken` error for a malformed, tampered or expired token.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }

    /// Build the HttpOnly session cookie for `token`.
    #[must_use]
    pub fn cookie(&self, token: String, secure: bool) -> Cookie<'static> {
        Cookie::build((AUTH_COOKIE_NAME, token))
            .path("/")
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.ttl.num_seconds()))
            .build()
    }
}

/// A cookie that, when removed from the jar, clears the session.
#[must_use]
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, "")).path("/").build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use jsonwebtoken::errors::ErrorKind;
    use secrecy::SecretString;

    use super::*;

    fn keys(secret: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: SecretString::from(secret.to_owned()),
            ttl_hours: 24,
        })
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys("k8#Vq2!mZp9@Lx4$Rw7^Tn1&Hy6*Bc3%");
        let token = keys.issue(UserId::new(42), UserRole::Admin).unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.user_id(), Some(UserId::new(42)));
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = keys("k8#Vq2!mZp9@Lx4$Rw7^Tn1&Hy6*Bc3%")
            .issue(UserId::new(1), UserRole::Customer)
            .unwrap();
        assert!(keys("a-completely-different-signing-key!").verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let keys = keys("k8#Vq2!mZp9@Lx4$Rw7^Tn1&Hy6*Bc3%");
        let now = Utc::now().timestamp();
        let token = keys
            .sign(&Claims {
                sub: "1".to_owned(),
                role: UserRole::Customer,
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();

        let err = keys.verify(&token).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let keys = keys("k8#Vq2!mZp9@Lx4$Rw7^Tn1&Hy6*Bc3%");
        let cookie = keys.cookie("token".to_owned(), true);

        assert_eq!(cookie.name(), AUTH_COOKIE_NAME);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(24)));
    }
}
