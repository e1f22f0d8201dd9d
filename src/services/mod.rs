// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod google_identity;
pub mod mollie;
pub mod payments;

pub use google_identity::{find_or_create_user, GoogleIdVerifier, GoogleProfile, IdentityError};
pub use mollie::MollieClient;
pub use payments::{
    ActivationError, CancelError, InitiateError, PaymentOrchestrator, WebhookOutcome,
};
