// SPDX-License-Identifier: MIT

//! Integration tests for the first-payment initiation flow.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use course_api::db::UserStore;
use course_api::models::User;
use tower::ServiceExt;

mod common;

fn signed_up_user() -> User {
    User::new("sub-1", "Ada Lovelace", "ada@example.com", None)
}

#[tokio::test]
async fn initiate_payment_creates_customer_token_and_redirects_to_checkout() {
    let ctx = common::create_test_app().await;
    ctx.store.save_user(&signed_up_user()).await.unwrap();

    let response = ctx
        .app
        .oneshot(
            Request::builder()
                .uri("/mollie/pay")
                .header(
                    header::COOKIE,
                    common::session_cookie_for(&signed_up_user(), &ctx.config),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        common::location_of(&response),
        "https://checkout.mollie.test/tr_new"
    );

    // Customer created at the provider and persisted locally
    let user = ctx.store.find_user("sub-1").await.unwrap().unwrap();
    assert_eq!(user.mollie_id.as_deref(), Some("cst_1"));

    let customer_requests = ctx.mollie.state.customer_requests.lock().unwrap().clone();
    assert_eq!(customer_requests.len(), 1);
    assert_eq!(customer_requests[0]["email"], "ada@example.com");
    assert_eq!(customer_requests[0]["name"], "Ada Lovelace");

    // One activation token persisted, bound into the redirect URL
    let tokens = ctx.store.activation_tokens();
    assert_eq!(tokens.len(), 1);

    let payment_requests = ctx.mollie.state.payment_requests.lock().unwrap().clone();
    assert_eq!(payment_requests.len(), 1);
    let redirect_url = payment_requests[0]["redirectUrl"].as_str().unwrap();
    assert!(redirect_url.contains(&tokens[0].token));
    assert!(redirect_url.ends_with("/payment-cb"));
    assert_eq!(payment_requests[0]["sequenceType"], "first");
    assert_eq!(payment_requests[0]["amount"]["value"], "10.00");
    // Dev environment: no webhook URL on the payload
    assert!(payment_requests[0].get("webhookUrl").is_none());
}

#[tokio::test]
async fn initiate_payment_reuses_existing_mollie_customer() {
    let ctx = common::create_test_app().await;
    let mut user = signed_up_user();
    user.mollie_id = Some("cst_existing".to_string());
    ctx.store.save_user(&user).await.unwrap();

    let response = ctx
        .app
        .oneshot(
            Request::builder()
                .uri("/mollie/pay")
                .header(
                    header::COOKIE,
                    common::session_cookie_for(&user, &ctx.config),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(ctx.mollie.state.customer_requests.lock().unwrap().is_empty());

    let payment_requests = ctx.mollie.state.payment_requests.lock().unwrap().clone();
    assert_eq!(payment_requests[0]["customerId"], "cst_existing");
}

#[tokio::test]
async fn initiate_payment_requires_authentication() {
    let ctx = common::create_test_app().await;

    let response = ctx
        .app
        .oneshot(
            Request::builder()
                .uri("/mollie/pay")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(common::location_of(&response), "/error?code=AUTH");
}

#[tokio::test]
async fn initiate_payment_without_user_record_redirects_with_code() {
    let ctx = common::create_test_app().await;
    // Valid session cookie, but no record in the store.

    let response = ctx
        .app
        .oneshot(
            Request::builder()
                .uri("/mollie/pay")
                .header(
                    header::COOKIE,
                    common::session_cookie_for(&signed_up_user(), &ctx.config),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(common::location_of(&response), "/error?code=NO_DB_USER_FOUND");
}

#[tokio::test]
async fn initiate_payment_surfaces_customer_creation_failure() {
    let ctx = common::create_test_app().await;
    ctx.store.save_user(&signed_up_user()).await.unwrap();
    *ctx.mollie.state.fail_create_customer.lock().unwrap() = true;

    let response = ctx
        .app
        .oneshot(
            Request::builder()
                .uri("/mollie/pay")
                .header(
                    header::COOKIE,
                    common::session_cookie_for(&signed_up_user(), &ctx.config),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        common::location_of(&response),
        "/error?code=CREATE_MOLLIE_FAILED"
    );

    // No half-done state: no customer id persisted, no token minted
    let user = ctx.store.find_user("sub-1").await.unwrap().unwrap();
    assert!(user.mollie_id.is_none());
    assert!(ctx.store.activation_tokens().is_empty());
}
