// SPDX-License-Identifier: MIT

//! Mollie payment routes: initiate, redirect callback, webhook, cancel.
//!
//! The user-initiated flows map every failure to an `/error?code=...`
//! redirect. The webhook has no user to redirect, so its failures propagate
//! as error responses for the platform's error reporting to pick up.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::Environment;
use crate::error::AppError;
use crate::middleware::auth::{create_session_token, read_session, session_redirect};
use crate::routes::{error_redirect, found_redirect};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/mollie/pay", get(pay))
        .route("/mollie/webhook", post(webhook))
        .route("/mollie/{token}/payment-cb", get(payment_callback))
        .route("/mollie/cancel-subscription", get(cancel_subscription))
}

/// Initiate a first payment: 302 to the Mollie hosted checkout.
async fn pay(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let session = read_session(&jar, &state.config.jwt_secret);
    let Some(user) = session.user.filter(|_| session.authed) else {
        return error_redirect("AUTH");
    };

    match state.payments.initiate_first_payment(&user.sub).await {
        Ok(checkout_url) => found_redirect(&checkout_url),
        Err(e) => {
            tracing::error!(user_id = %user.sub, error = %e, "Payment initiation failed");
            error_redirect(e.code())
        }
    }
}

/// Webhook body: Mollie posts the payment id. `mock` and the override
/// fields are honored in dev only, where Mollie cannot reach the server.
#[derive(Deserialize)]
struct WebhookBody {
    id: String,
    #[serde(default)]
    mock: bool,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "sequenceType")]
    sequence_type: Option<String>,
}

/// Handle a Mollie payment notification.
async fn webhook(
    State(state): State<Arc<AppState>>,
    Json(body): Json<WebhookBody>,
) -> Result<StatusCode, AppError> {
    let mut transaction = state.mollie.get_payment(&body.id).await?;

    // Local testing hook: this must never trigger outside dev.
    if state.config.env == Environment::Dev && body.mock {
        if let Some(status) = body.status {
            transaction.status = status;
        }
        if let Some(sequence_type) = body.sequence_type {
            transaction.sequence_type = sequence_type;
        }
    }

    let outcome = state.payments.process_webhook(&transaction).await?;

    tracing::info!(
        payment_id = %body.id,
        status = %transaction.status,
        sequence_type = %transaction.sequence_type,
        ?outcome,
        "Webhook processed"
    );

    Ok(StatusCode::OK)
}

/// Redirect-based activation: consume the token, mark the subscription
/// active and reissue the session cookie with the new active flag.
async fn payment_callback(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    jar: CookieJar,
) -> Response {
    let session = read_session(&jar, &state.config.jwt_secret);
    let Some(session_user) = session.user.filter(|_| session.authed) else {
        return error_redirect("AUTH");
    };

    let user = match state
        .payments
        .activate_from_callback(&token, &session_user.sub)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(user_id = %session_user.sub, error = %e, "Payment callback rejected");
            return error_redirect(e.code());
        }
    };

    match create_session_token(&user, &state.config.jwt_secret) {
        Ok(jwt) => session_redirect(&jwt, "/mollie/cb?code=FIRST_PAYMENT_OK"),
        Err(e) => AppError::Internal(e).into_response(),
    }
}

/// Cancel the active subscription and reissue the session cookie with
/// `active: false`.
async fn cancel_subscription(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let session = read_session(&jar, &state.config.jwt_secret);
    let Some(session_user) = session.user.filter(|_| session.authed) else {
        return error_redirect("AUTH");
    };

    let user = match state.payments.cancel(&session_user.sub).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(user_id = %session_user.sub, error = %e, "Cancellation failed");
            return error_redirect(e.code());
        }
    };

    match create_session_token(&user, &state.config.jwt_secret) {
        Ok(jwt) => session_redirect(&jwt, "/mollie/cb?code=CANCEL_OK"),
        Err(e) => AppError::Internal(e).into_response(),
    }
}
