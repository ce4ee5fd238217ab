//! Sign in with Google: redirects and callback failures that never reach the
//! provider.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};

use shopfront_integration_tests::{FRONTEND_URL, OAUTH_AUTH_URL, TestContext, body_json};

fn oauth_get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-forwarded-for", "198.51.100.20");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

#[tokio::test]
async fn test_oauth_not_configured_is_not_found() {
    let ctx = TestContext::new();

    let response = ctx.send(oauth_get("/api/auth/oauth/google", None)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_redirects_with_state_cookie() {
    let ctx = TestContext::with_oauth();

    let response = ctx.send(oauth_get("/api/auth/oauth/google", None)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response);
    assert!(target.starts_with(OAUTH_AUTH_URL), "{target}");
    assert!(target.contains("client_id=test-client"));
    assert!(target.contains("response_type=code"));

    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("shop_oauth_state="));
    assert!(set_cookie.contains("HttpOnly"));

    // The same state goes to the provider and into the cookie
    let cookie_state = set_cookie
        .trim_start_matches("shop_oauth_state=")
        .split(';')
        .next()
        .unwrap();
    assert_eq!(cookie_state.len(), 32);
    assert!(target.contains(&format!("state={cookie_state}")));
}

#[tokio::test]
async fn test_callback_denied_redirects_to_login() {
    let ctx = TestContext::with_oauth();

    let response = ctx
        .send(oauth_get(
            "/api/auth/oauth/google/callback?error=access_denied",
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        format!("{FRONTEND_URL}/login?error=oauth_denied")
    );
}

#[tokio::test]
async fn test_callback_without_code() {
    let ctx = TestContext::with_oauth();

    let response = ctx
        .send(oauth_get(
            "/api/auth/oauth/google/callback?state=abc",
            Some("shop_oauth_state=abc"),
        ))
        .await;

    assert_eq!(
        location(&response),
        format!("{FRONTEND_URL}/login?error=missing_code")
    );
}

#[tokio::test]
async fn test_callback_rejects_state_mismatch() {
    let ctx = TestContext::with_oauth();

    for cookie in [Some("shop_oauth_state=expected"), None] {
        let response = ctx
            .send(oauth_get(
                "/api/auth/oauth/google/callback?code=xyz&state=forged",
                cookie,
            ))
            .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            format!("{FRONTEND_URL}/login?error=invalid_state")
        );
    }
}

#[tokio::test]
async fn test_callback_with_malformed_query_is_json_bad_request() {
    let ctx = TestContext::with_oauth();

    let response = ctx
        .send(oauth_get(
            "/api/auth/oauth/google/callback?code=a&code=b&state=x",
            Some("shop_oauth_state=x"),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("duplicate field"));
}
