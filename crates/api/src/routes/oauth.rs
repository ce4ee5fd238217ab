//! Sign in with Google route handlers.
//!
//! Handles the authorization-code flow:
//! - Login: stores a random `state` in a cookie and redirects to Google
//! - Callback: checks `state`, exchanges the code, upserts the user and sets
//!   the session cookie
//!
//! Failures redirect to `<frontend>/login?error=<code>`.

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::error::AppError;
use crate::routes::auth::start_session;
use crate::services::oauth::{
    STATE_COOKIE_NAME, STATE_LENGTH, generate_random_string, state_cookie, state_removal_cookie,
};
use crate::services::{AuthError, AuthService, OAuthClient};
use crate::state::AppState;

/// Query parameters from the provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
}

fn client(state: &AppState) -> Result<&OAuthClient, AppError> {
    state
        .oauth()
        .ok_or_else(|| AppError::NotFound("Sign-in provider not configured".to_owned()))
}

fn redirect_uri(state: &AppState) -> String {
    format!("{}/api/auth/oauth/google/callback", state.config().base_url)
}

/// Redirect to the frontend login page with an error code.
fn login_error(state: &AppState, jar: CookieJar, code: &str) -> Response {
    let url = format!("{}/login?error={code}", state.config().frontend_url);
    (jar.remove(state_removal_cookie()), Redirect::to(&url)).into_response()
}

/// Redirect to Google's consent page.
///
/// # Route
///
/// `GET /api/auth/oauth/google`
pub async fn login(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let client = client(&state)?;

    let oauth_state = generate_random_string(STATE_LENGTH);
    let auth_url = client.authorization_url(&redirect_uri(&state), &oauth_state);
    let jar = jar.add(state_cookie(oauth_state, state.config().secure_cookies()));

    Ok((jar, Redirect::to(&auth_url)).into_response())
}

/// Handle the provider callback.
///
/// # Route
///
/// `GET /api/auth/oauth/google/callback`
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    query: std::result::Result<Query<CallbackQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let client = client(&state)?;
    let Query(query) = query?;

    if let Some(error) = query.error {
        tracing::warn!(error = %error, "OAuth authorization denied");
        return Ok(login_error(&state, jar, "oauth_denied"));
    }

    let Some(code) = query.code else {
        tracing::warn!("OAuth callback missing code");
        return Ok(login_error(&state, jar, "missing_code"));
    };

    let stored_state = jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_owned());
    if stored_state.is_none() || stored_state != query.state {
        tracing::warn!("OAuth state mismatch");
        return Ok(login_error(&state, jar, "invalid_state"));
    }

    let user_info = match client.exchange_code(&code, &redirect_uri(&state)).await {
        Ok(access_token) => client.user_info(&access_token).await,
        Err(e) => Err(e),
    };
    let user_info = match user_info {
        Ok(info) => info,
        Err(e) => {
            tracing::error!(error = %e, "OAuth provider request failed");
            return Ok(login_error(&state, jar, "provider_error"));
        }
    };

    let user = match AuthService::new(state.pool()).oauth_sign_in(&user_info).await {
        Ok(user) => user,
        Err(AuthError::OAuthRejected(reason)) => {
            tracing::warn!(reason = %reason, "OAuth sign-in rejected");
            return Ok(login_error(&state, jar, "account_conflict"));
        }
        Err(e) => {
            tracing::error!(error = %e, "OAuth sign-in failed");
            return Ok(login_error(&state, jar, "server_error"));
        }
    };

    let jar = jar.remove(state_removal_cookie());
    let jar = match start_session(&state, jar, &user).await {
        Ok(jar) => jar,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start session after OAuth");
            return Ok(login_error(&state, CookieJar::new(), "server_error"));
        }
    };

    Ok((jar, Redirect::to(&state.config().frontend_url)).into_response())
}
