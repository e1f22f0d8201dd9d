// SPDX-License-Identifier: MIT

//! User and activation-token models for storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How long an activation token stays valid after creation.
pub const ACTIVATION_TOKEN_TTL_MINUTES: i64 = 15;

/// User profile stored in the document store, keyed by the Google subject id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Google identity subject (also used as document ID)
    pub id: String,
    /// Display name from the identity provider
    pub username: String,
    /// Email address, stored lowercased and unique
    pub email: String,
    /// Profile picture URL
    pub picture: Option<String>,
    /// Whether the user currently has a paid subscription
    pub subscription_active: bool,
    /// Mollie customer id, created lazily on the first payment attempt
    pub mollie_id: Option<String>,
    /// Active Mollie subscription id, cleared on cancellation
    pub subscription_id: Option<String>,
}

impl User {
    /// Create a fresh user record for a first-time sign-in.
    pub fn new(id: &str, username: &str, email: &str, picture: Option<String>) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            email: email.to_lowercase(),
            picture,
            subscription_active: false,
            mollie_id: None,
            subscription_id: None,
        }
    }
}

/// Single-use token binding a Mollie redirect callback to a payment attempt.
///
/// Purged by the store once `expire_at` passes, whether or not it was
/// consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationToken {
    /// Opaque random token (also used as document ID)
    pub token: String,
    /// Expiry timestamp, 15 minutes after creation
    pub expire_at: DateTime<Utc>,
}

impl ActivationToken {
    /// Create a token record with a fresh random value.
    pub fn generate() -> Self {
        Self {
            token: uuid::Uuid::new_v4().to_string(),
            expire_at: Utc::now() + chrono::Duration::minutes(ACTIVATION_TOKEN_TTL_MINUTES),
        }
    }

    /// Whether the token's 15-minute window has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expire_at
    }
}
