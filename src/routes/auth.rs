// SPDX-License-Identifier: MIT

//! Google sign-in and logout routes.

use axum::{
    extract::State,
    response::Response,
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::{create_session_token, logout_redirect, session_redirect};
use crate::services::google_identity::find_or_create_user;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/success", post(sign_in_callback))
        .route("/auth/logout", get(logout))
}

/// Form body posted by the Google sign-in button.
#[derive(Deserialize)]
struct SignInForm {
    credential: String,
}

/// Google sign-in callback: verify the ID token, find or create the user,
/// issue a session cookie and redirect home.
async fn sign_in_callback(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SignInForm>,
) -> Result<Response> {
    let profile = state
        .google_verifier
        .verify_identity(&form.credential)
        .await?;

    let user = find_or_create_user(state.store.as_ref(), &profile).await?;

    tracing::info!(user_id = %user.id, active = user.subscription_active, "User signed in");

    let token = create_session_token(&user, &state.config.jwt_secret)
        .map_err(crate::error::AppError::Internal)?;

    Ok(session_redirect(&token, "/"))
}

/// Logout: overwrite the session cookie with a near-immediate expiry.
async fn logout() -> Response {
    logout_redirect()
}
