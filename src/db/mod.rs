// SPDX-License-Identifier: MIT

//! Database layer (Firestore, plus an in-memory store for tests and local dev).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{ActivationToken, User};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const ACTIVATION_TOKENS: &str = "activation_tokens";
}

/// Storage operations for users and activation tokens.
///
/// Lookup misses are `Ok(None)`; a store that cannot be reached is an
/// `Err(AppError::Database)`. Callers must not treat the latter as "not
/// found": masking transient outages is how duplicate user records get
/// created.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by Google subject id.
    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Look up a user by their Mollie customer id.
    async fn find_user_by_mollie_id(&self, mollie_id: &str) -> Result<Option<User>, AppError>;

    /// Insert a new user. Fails with `AppError::Database` when the id or
    /// email is already taken.
    async fn create_user(&self, user: &User) -> Result<(), AppError>;

    /// Upsert a user record keyed by id.
    async fn save_user(&self, user: &User) -> Result<(), AppError>;

    /// Count all user records.
    async fn count_users(&self) -> Result<usize, AppError>;

    /// List all user records.
    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    /// Persist a new activation token.
    async fn create_activation_token(&self, token: &ActivationToken) -> Result<(), AppError>;

    /// Look up an activation token without consuming it. Expired tokens are
    /// reported as `Ok(None)`.
    async fn find_activation_token(&self, token: &str)
        -> Result<Option<ActivationToken>, AppError>;

    /// Atomically find and delete an activation token.
    ///
    /// Exactly one concurrent caller observes `Some`; this closes the race
    /// between the redirect callback and a duplicate webhook delivery.
    async fn take_activation_token(&self, token: &str)
        -> Result<Option<ActivationToken>, AppError>;

    /// Delete an activation token by value, ignoring whether it existed.
    async fn delete_activation_token(&self, token: &str) -> Result<(), AppError>;
}
