// SPDX-License-Identifier: MIT

//! Integration tests for session issuance and logout.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn logout_expires_session_cookie_and_redirects_home() {
    let ctx = common::create_test_app().await;

    let response = ctx
        .app
        .oneshot(
            Request::builder()
                .uri("/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(common::location_of(&response), "/");

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("missing Set-Cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("jwt="));
    assert!(set_cookie.contains("Max-Age=1"));
    assert!(set_cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn malformed_credential_is_unauthorized() {
    let ctx = common::create_test_app().await;

    let response = ctx
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/success")
                .header(
                    header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(Body::from("credential=not-a-jwt"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let ctx = common::create_test_app().await;

    let response = ctx
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
