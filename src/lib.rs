// SPDX-License-Identifier: MIT

//! Course platform API: subscription-gated course access.
//!
//! This crate provides the backend for Google sign-in, cookie-based JWT
//! sessions, and the Mollie-backed subscription lifecycle (first payment,
//! webhook activation, cancellation).

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::UserStore;
use services::{GoogleIdVerifier, MollieClient, PaymentOrchestrator};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn UserStore>,
    pub mollie: MollieClient,
    pub google_verifier: Arc<GoogleIdVerifier>,
    pub payments: PaymentOrchestrator,
}
