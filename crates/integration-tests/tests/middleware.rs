//! Health checks and the middleware stack.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};

use shopfront_integration_tests::{FRONTEND_URL, TestContext, body_text, get};

#[tokio::test]
async fn test_health_is_ok() {
    let ctx = TestContext::new();

    let response = ctx.send(get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let ctx = TestContext::new();

    // An error response still gets the headers
    let response = ctx
        .send(get("/api/auth/me").body(Body::empty()).unwrap())
        .await;
    let headers = response.headers();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["referrer-policy"], "no-referrer");
    assert!(
        headers["content-security-policy"]
            .to_str()
            .unwrap()
            .contains("default-src 'none'")
    );
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let ctx = TestContext::new();

    let response = ctx
        .send(
            get("/health")
                .header("x-request-id", "trace-abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.headers()["x-request-id"], "trace-abc-123");
}

#[tokio::test]
async fn test_request_id_is_generated_when_missing_or_invalid() {
    let ctx = TestContext::new();

    for request in [
        get("/health").body(Body::empty()).unwrap(),
        get("/health")
            .header("x-request-id", "has spaces in it")
            .body(Body::empty())
            .unwrap(),
    ] {
        let response = ctx.send(request).await;
        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok(), "not a uuid: {id}");
    }
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend_with_credentials() {
    let ctx = TestContext::new();

    let response = ctx
        .send(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/cart/items")
                .header(header::ORIGIN, FRONTEND_URL)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    let headers = response.headers();

    assert!(response.status().is_success());
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], FRONTEND_URL);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert!(
        headers[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap()
            .contains("PATCH")
    );
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let ctx = TestContext::new();

    let response = ctx
        .send(get("/api/nope").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
