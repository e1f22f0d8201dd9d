// SPDX-License-Identifier: MIT

//! In-memory store for integration tests and local development.
//!
//! Mirrors the Firestore semantics: unique user id and email, activation
//! tokens swept 15 minutes after creation, and atomic token take under a
//! single lock.

use crate::db::UserStore;
use crate::error::AppError;
use crate::models::{ActivationToken, User};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    tokens: HashMap<String, ActivationToken>,
}

/// In-memory implementation of [`UserStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    /// When set, every operation fails with a database error. Used by tests
    /// to exercise store-unavailable paths.
    unavailable: Mutex<bool>,
    /// When set, only writes fail. Used by tests to exercise the
    /// "provider succeeded, save failed" paths.
    fail_saves: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a user record.
    pub fn with_user(self, user: User) -> Self {
        self.inner.lock().unwrap().users.insert(user.id.clone(), user);
        self
    }

    /// Toggle simulated store unavailability.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    /// Toggle simulated write failures (reads keep working).
    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock().unwrap() = fail;
    }

    /// Snapshot of the live (non-expired) activation tokens.
    pub fn activation_tokens(&self) -> Vec<ActivationToken> {
        let mut inner = self.inner.lock().unwrap();
        Self::sweep_expired(&mut inner);
        inner.tokens.values().cloned().collect()
    }

    fn check_available(&self) -> Result<(), AppError> {
        if *self.unavailable.lock().unwrap() {
            return Err(AppError::Database("store unavailable".to_string()));
        }
        Ok(())
    }

    fn sweep_expired(inner: &mut Inner) {
        let now = chrono::Utc::now();
        inner.tokens.retain(|_, t| !t.is_expired(now));
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.check_available()?;
        Ok(self.inner.lock().unwrap().users.get(id).cloned())
    }

    async fn find_user_by_mollie_id(&self, mollie_id: &str) -> Result<Option<User>, AppError> {
        self.check_available()?;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.mollie_id.as_deref() == Some(mollie_id))
            .cloned())
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.check_available()?;
        let mut inner = self.inner.lock().unwrap();

        if inner.users.contains_key(&user.id) {
            return Err(AppError::Database(format!("duplicate id: {}", user.id)));
        }
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Database(format!(
                "duplicate email: {}",
                user.email
            )));
        }

        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn save_user(&self, user: &User) -> Result<(), AppError> {
        self.check_available()?;
        if *self.fail_saves.lock().unwrap() {
            return Err(AppError::Database("write rejected".to_string()));
        }
        self.inner
            .lock()
            .unwrap()
            .users
            .insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn count_users(&self) -> Result<usize, AppError> {
        self.check_available()?;
        Ok(self.inner.lock().unwrap().users.len())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.check_available()?;
        Ok(self.inner.lock().unwrap().users.values().cloned().collect())
    }

    async fn create_activation_token(&self, token: &ActivationToken) -> Result<(), AppError> {
        self.check_available()?;
        let mut inner = self.inner.lock().unwrap();
        Self::sweep_expired(&mut inner);
        inner.tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_activation_token(
        &self,
        token: &str,
    ) -> Result<Option<ActivationToken>, AppError> {
        self.check_available()?;
        let mut inner = self.inner.lock().unwrap();
        Self::sweep_expired(&mut inner);
        Ok(inner.tokens.get(token).cloned())
    }

    async fn take_activation_token(
        &self,
        token: &str,
    ) -> Result<Option<ActivationToken>, AppError> {
        self.check_available()?;
        let mut inner = self.inner.lock().unwrap();
        Self::sweep_expired(&mut inner);
        Ok(inner.tokens.remove(token))
    }

    async fn delete_activation_token(&self, token: &str) -> Result<(), AppError> {
        self.check_available()?;
        self.inner.lock().unwrap().tokens.remove(token);
        Ok(())
    }
}
