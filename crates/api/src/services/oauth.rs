//! Google `OpenID Connect` client for the authorization-code flow.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, SameSite};
use rand::Rng;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::OAuthConfig;
use crate::services::auth::AuthError;

/// Provider name stored on linked accounts.
pub const PROVIDER: &str = "google";

/// Cookie holding the CSRF `state` between redirect and callback.
pub const STATE_COOKIE_NAME: &str = "shop_oauth_state";

const STATE_COOKIE_PATH: &str = "/api/auth/oauth";

/// Length of the random `state` value.
pub const STATE_LENGTH: usize = 32;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Claims returned by the userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub name: Option<String>,
}

/// OAuth client. Cheap to clone.
#[derive(Clone)]
pub struct OAuthClient {
    inner: Arc<OAuthClientInner>,
}

struct OAuthClientInner {
    client: reqwest::Client,
    config: OAuthConfig,
}

impl OAuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            inner: Arc::new(OAuthClientInner {
                client: reqwest::Client::new(),
                config,
            }),
        }
    }

    /// URL to send the browser to.
    #[must_use]
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&scope=openid%20email%20profile&state={}",
            self.inner.config.auth_url,
            urlencoding::encode(&self.inner.config.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::OAuthProvider` if the provider rejects the code or is unreachable.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, AuthError> {
        let config = &self.inner.config;
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .inner
            .client
            .post(&config.token_url)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::OAuthProvider(format!(
                "token exchange failed ({status}): {text}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Fetch the signed-in user's identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::OAuthProvider` if the request fails.
    pub async fn user_info(&self, access_token: &str) -> Result<UserInfo, AuthError> {
        let response = self
            .inner
            .client
            .get(&self.inner.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::OAuthProvider(format!(
                "userinfo request failed ({})",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}

/// Generate a cryptographically secure random string.
#[must_use]
pub fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .filter_map(|_| {
            CHARSET
                .get(rng.random_range(0..CHARSET.len()))
                .copied()
                .map(char::from)
        })
        .collect()
}

/// Short-lived cookie carrying the `state` to the callback.
#[must_use]
pub fn state_cookie(state: String, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, state))
        .path(STATE_COOKIE_PATH)
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(10))
        .build()
}

#[must_use]
pub fn state_removal_cookie() -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, "")).path(STATE_COOKIE_PATH).build()
}
