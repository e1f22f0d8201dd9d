// SPDX-License-Identifier: MIT

//! Course Platform API Server
//!
//! Serves the subscription core of the course platform: Google sign-in,
//! cookie sessions, and Mollie payment/subscription handling.

use course_api::{
    config::Config,
    db::{FirestoreStore, UserStore},
    services::{GoogleIdVerifier, MollieClient, PaymentOrchestrator},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, env = ?config.env, "Starting course API");

    // Initialize Firestore-backed store
    let store: Arc<dyn UserStore> = Arc::new(
        FirestoreStore::new(&config.gcp_project_id)
            .await
            .expect("Failed to connect to Firestore"),
    );

    // Initialize Google sign-in verifier
    let google_verifier =
        Arc::new(GoogleIdVerifier::new(&config).expect("Failed to initialize identity verifier"));

    // Initialize Mollie client and payment orchestrator
    let mollie = MollieClient::new(config.mollie_api_url.clone(), config.mollie_api_key.clone());
    let payments = PaymentOrchestrator::new(store.clone(), mollie.clone(), &config);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        mollie,
        google_verifier,
        payments,
    });

    // Build router
    let app = course_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("course_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
