// SPDX-License-Identifier: MIT

//! Firestore-backed user and activation-token store.
//!
//! Users are keyed by their Google subject id, activation tokens by the token
//! value itself, so document-id semantics give uniqueness on both. Email
//! uniqueness is enforced with a pre-insert query (Firestore has no unique
//! field constraints). Expired activation tokens are filtered on read; the
//! deployed project additionally carries a TTL policy on `expire_at` so the
//! documents themselves get purged.

use crate::db::{collections, UserStore};
use crate::error::AppError;
use crate::models::{ActivationToken, User};
use async_trait::async_trait;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_lowercase();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("email").eq(email.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }
}

#[async_trait]
impl UserStore for FirestoreStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_user_by_mollie_id(&self, mollie_id: &str) -> Result<Option<User>, AppError> {
        let mollie_id = mollie_id.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("mollie_id").eq(mollie_id.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        if self.find_user_by_email(&user.email).await?.is_some() {
            return Err(AppError::Database(format!(
                "duplicate email: {}",
                user.email
            )));
        }

        // Insert fails if the document id is already taken.
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(format!("duplicate id {}: {}", user.id, e)))?;
        Ok(())
    }

    async fn save_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn count_users(&self) -> Result<usize, AppError> {
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.len())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn create_activation_token(&self, token: &ActivationToken) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::ACTIVATION_TOKENS)
            .document_id(&token.token)
            .object(token)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn find_activation_token(
        &self,
        token: &str,
    ) -> Result<Option<ActivationToken>, AppError> {
        let record: Option<ActivationToken> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVATION_TOKENS)
            .obj()
            .one(token)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(record.filter(|r| !r.is_expired(chrono::Utc::now())))
    }

    async fn take_activation_token(
        &self,
        token: &str,
    ) -> Result<Option<ActivationToken>, AppError> {
        let client = self.get_client()?;

        // Transactional read-then-delete. The read must be bound to the
        // transaction so it lands in the read set; a concurrent taker then
        // conflicts on commit and only one caller observes the token.
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let tx_db = client.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ),
        );
        let record: Option<ActivationToken> = tx_db
            .fluent()
            .select()
            .by_id_in(collections::ACTIVATION_TOKENS)
            .obj()
            .one(token)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(record) = record else {
            let _ = transaction.rollback().await;
            return Ok(None);
        };

        client
            .fluent()
            .delete()
            .from(collections::ACTIVATION_TOKENS)
            .document_id(token)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add deletion to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        if record.is_expired(chrono::Utc::now()) {
            tracing::debug!(token, "Activation token expired, dropped on take");
            return Ok(None);
        }

        Ok(Some(record))
    }

    async fn delete_activation_token(&self, token: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::ACTIVATION_TOKENS)
            .document_id(token)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
