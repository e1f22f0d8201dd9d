// SPDX-License-Identifier: MIT

//! Payment orchestrator: the subscription lifecycle state machine.
//!
//! Drives the Mollie customer / payment / mandate / subscription APIs and
//! keeps the local user record in step. Per-user states are inferred from
//! stored fields: no `mollie_id` means no payment method yet; `mollie_id`
//! without `subscription_active` means a payment method only; an active flag
//! plus `subscription_id` means a running subscription.
//!
//! The redirect callback and the webhook can arrive in either order and the
//! webhook may be delivered more than once, so both activation paths are
//! idempotent.

use crate::config::Config;
use crate::db::UserStore;
use crate::error::AppError;
use crate::models::{ActivationToken, User};
use crate::services::mollie::{
    Amount, CreatePayment, CreateSubscription, MollieClient, Payment,
};
use std::sync::Arc;

/// Orchestrates subscription transitions against Mollie and the store.
#[derive(Clone)]
pub struct PaymentOrchestrator {
    store: Arc<dyn UserStore>,
    mollie: MollieClient,
    app_url: String,
    webhook_url: Option<String>,
    first_description: String,
    subscription_description: String,
}

/// Failures while initiating a first payment, one per flow step so the
/// error page can tell "payment never attempted" from "payment half done".
#[derive(Debug, thiserror::Error)]
pub enum InitiateError {
    #[error("no user record for session")]
    NoUser,
    #[error("creating Mollie customer failed: {0}")]
    CreateCustomer(AppError),
    #[error("persisting Mollie customer id failed: {0}")]
    SaveCustomerId(AppError),
    #[error("creating payment failed: {0}")]
    CreatePayment(AppError),
    #[error(transparent)]
    Store(AppError),
}

impl InitiateError {
    /// Error-page code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            InitiateError::NoUser => "NO_DB_USER_FOUND",
            InitiateError::CreateCustomer(_) => "CREATE_MOLLIE_FAILED",
            InitiateError::SaveCustomerId(_) => "SAVE_MOLLIE_ID_DB",
            InitiateError::CreatePayment(_) => "CREATE_PAYMENT_FAILED",
            InitiateError::Store(_) => "DB_CON",
        }
    }
}

/// Failures on the redirect-callback activation path.
#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    #[error("activation token absent or already consumed")]
    InvalidToken,
    #[error("no user record for session")]
    NoUser,
    #[error(transparent)]
    Store(AppError),
}

impl ActivationError {
    pub fn code(&self) -> &'static str {
        match self {
            ActivationError::InvalidToken => "INVALID_ACTIVATION_TOKEN",
            ActivationError::NoUser => "NO_DB_USER_FOUND",
            ActivationError::Store(_) => "DB_CON",
        }
    }
}

/// Failures while cancelling, distinguishing the provider call from the
/// database write after it. The latter leaves Mollie cancelled but the local
/// record active, which needs manual reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum CancelError {
    #[error("no user record for session")]
    NoUser,
    #[error("user lookup failed: {0}")]
    FindUser(AppError),
    #[error("Mollie cancel call failed: {0}")]
    Provider(AppError),
    #[error("persisting cancellation failed: {0}")]
    SaveAfterCancel(AppError),
}

impl CancelError {
    pub fn code(&self) -> &'static str {
        match self {
            CancelError::NoUser => "NO_DB_USER_FOUND",
            CancelError::FindUser(_) => "FAILED_TO_FIND_USER",
            CancelError::Provider(_) => "CANCEL_FAILED",
            CancelError::SaveAfterCancel(_) => "CANCEL_DB_USER_SAVE_FAILED",
        }
    }
}

/// What a webhook delivery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// `paid`/`first`: recurring subscription created and persisted.
    SubscriptionActivated,
    /// `canceled|failed`/`recurring`: subscription cancelled and cleared.
    SubscriptionCancelled,
    /// Duplicate delivery for an already-activated user.
    AlreadyActive,
    /// Any other `(status, sequenceType)` combination.
    Ignored,
}

impl PaymentOrchestrator {
    pub fn new(store: Arc<dyn UserStore>, mollie: MollieClient, config: &Config) -> Self {
        Self {
            store,
            mollie,
            app_url: config.app_url.clone(),
            webhook_url: config.webhook_url(),
            first_description: config.mollie_first_description.clone(),
            subscription_description: config.mollie_subscription_description.clone(),
        }
    }

    /// Initiate a first payment for an authenticated user.
    ///
    /// Creates the Mollie customer lazily, persists an activation token
    /// binding the redirect callback to this attempt, creates a one-off
    /// `first` payment and returns the hosted checkout URL.
    pub async fn initiate_first_payment(&self, user_id: &str) -> Result<String, InitiateError> {
        let mut user = self
            .store
            .find_user(user_id)
            .await
            .map_err(InitiateError::Store)?
            .ok_or(InitiateError::NoUser)?;

        let mollie_id = match &user.mollie_id {
            Some(id) => id.clone(),
            None => {
                let customer = self
                    .mollie
                    .create_customer(&user.email, &user.username)
                    .await
                    .map_err(InitiateError::CreateCustomer)?;

                user.mollie_id = Some(customer.id.clone());
                self.store
                    .save_user(&user)
                    .await
                    .map_err(InitiateError::SaveCustomerId)?;

                tracing::info!(user_id, customer_id = %customer.id, "Mollie customer created");
                customer.id
            }
        };

        // Without this token anyone could navigate to the payment callback
        // and activate a subscription.
        let token = ActivationToken::generate();
        self.store
            .create_activation_token(&token)
            .await
            .map_err(InitiateError::Store)?;

        let request = CreatePayment {
            amount: Amount::subscription_price(),
            customer_id: mollie_id,
            sequence_type: "first".to_string(),
            description: self.first_description.clone(),
            webhook_url: self.webhook_url.clone(),
            redirect_url: format!("{}/mollie/{}/payment-cb", self.app_url, token.token),
        };

        let payment = self
            .mollie
            .create_payment(&request)
            .await
            .map_err(InitiateError::CreatePayment)?;

        let checkout = payment.checkout_url().ok_or_else(|| {
            InitiateError::CreatePayment(AppError::MollieApi(
                "payment response missing checkout link".to_string(),
            ))
        })?;

        tracing::info!(user_id, payment_id = %payment.id, "First payment created");
        Ok(checkout.to_string())
    }

    /// Activate the session user's subscription from the redirect callback.
    ///
    /// Consumes the activation token atomically: a replayed callback (or a
    /// racing duplicate webhook) observes `InvalidToken` instead of
    /// re-activating. Does not create the recurring subscription; that is
    /// the webhook's job.
    pub async fn activate_from_callback(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<User, ActivationError> {
        let taken = self
            .store
            .take_activation_token(token)
            .await
            .map_err(ActivationError::Store)?;

        if taken.is_none() {
            tracing::warn!(user_id, "Activation attempted with invalid or consumed token");
            return Err(ActivationError::InvalidToken);
        }

        let mut user = self
            .store
            .find_user(user_id)
            .await
            .map_err(ActivationError::Store)?
            .ok_or(ActivationError::NoUser)?;

        user.subscription_active = true;
        self.store
            .save_user(&user)
            .await
            .map_err(ActivationError::Store)?;

        tracing::info!(user_id, "Subscription activated via payment callback");
        Ok(user)
    }

    /// Process a webhook transaction, branching on `(status, sequenceType)`.
    ///
    /// Failures propagate: the webhook flow has no user to redirect, so the
    /// hosting platform's error reporting is the audience.
    pub async fn process_webhook(&self, transaction: &Payment) -> Result<WebhookOutcome, AppError> {
        let user = self
            .store
            .find_user_by_mollie_id(&transaction.customer_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no user for Mollie customer {} (payment {})",
                    transaction.customer_id, transaction.id
                ))
            })?;

        match (transaction.status.as_str(), transaction.sequence_type.as_str()) {
            ("canceled" | "failed", "recurring") => {
                self.cancel_after_failed_recurring(user).await?;
                Ok(WebhookOutcome::SubscriptionCancelled)
            }
            ("paid", "first") => self.activate_after_first_payment(user).await,
            (status, sequence_type) => {
                tracing::debug!(
                    status,
                    sequence_type,
                    payment_id = %transaction.id,
                    "Ignoring unhandled payment state"
                );
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    /// Cancel the session user's subscription.
    pub async fn cancel(&self, user_id: &str) -> Result<User, CancelError> {
        let mut user = self
            .store
            .find_user(user_id)
            .await
            .map_err(CancelError::FindUser)?
            .ok_or(CancelError::NoUser)?;

        let (mollie_id, subscription_id) = match (&user.mollie_id, &user.subscription_id) {
            (Some(m), Some(s)) => (m.clone(), s.clone()),
            _ => {
                return Err(CancelError::Provider(AppError::BadRequest(
                    "user has no active subscription".to_string(),
                )))
            }
        };

        self.mollie
            .cancel_subscription(&mollie_id, &subscription_id)
            .await
            .map_err(CancelError::Provider)?;

        user.subscription_active = false;
        user.subscription_id = None;
        if let Err(e) = self.store.save_user(&user).await {
            // Mollie already cancelled; the local record still says active.
            // Operator must reconcile by hand.
            tracing::error!(
                user_id,
                subscription_id = %subscription_id,
                error = %e,
                "Subscription cancelled at Mollie but persisting the cancellation failed"
            );
            return Err(CancelError::SaveAfterCancel(e));
        }

        tracing::info!(user_id, subscription_id = %subscription_id, "Subscription cancelled");
        Ok(user)
    }

    async fn cancel_after_failed_recurring(&self, mut user: User) -> Result<(), AppError> {
        let mollie_id = user
            .mollie_id
            .clone()
            .ok_or_else(|| AppError::NotFound(format!("user {} has no Mollie id", user.id)))?;
        let subscription_id = user.subscription_id.clone().ok_or_else(|| {
            AppError::NotFound(format!("user {} has no subscription id", user.id))
        })?;

        self.mollie
            .cancel_subscription(&mollie_id, &subscription_id)
            .await
            .map_err(|e| {
                AppError::MollieApi(format!(
                    "cancelling subscription {} after failed recurring payment: {}",
                    subscription_id, e
                ))
            })?;

        user.subscription_active = false;
        user.subscription_id = None;
        self.store.save_user(&user).await?;

        tracing::info!(
            user_id = %user.id,
            subscription_id = %subscription_id,
            "Subscription cancelled after failed recurring payment"
        );
        Ok(())
    }

    async fn activate_after_first_payment(
        &self,
        mut user: User,
    ) -> Result<WebhookOutcome, AppError> {
        // Duplicate webhook delivery: a second subscription at Mollie would
        // double-charge, so an already-recorded subscription ends the flow.
        if user.subscription_active && user.subscription_id.is_some() {
            tracing::debug!(user_id = %user.id, "Webhook replay for already-active user");
            return Ok(WebhookOutcome::AlreadyActive);
        }

        let mollie_id = user
            .mollie_id
            .clone()
            .ok_or_else(|| AppError::NotFound(format!("user {} has no Mollie id", user.id)))?;

        let mandates = self.mollie.list_mandates(&mollie_id).await?;
        if !mandates.iter().any(|m| m.is_chargeable()) {
            return Err(AppError::MollieApi(format!(
                "no valid or pending mandate for customer {}",
                mollie_id
            )));
        }

        let request = CreateSubscription {
            amount: Amount::subscription_price(),
            interval: "1 month".to_string(),
            description: self.subscription_description.clone(),
            webhook_url: self.webhook_url.clone(),
        };

        let subscription = self.mollie.create_subscription(&mollie_id, &request).await?;

        user.subscription_active = true;
        user.subscription_id = Some(subscription.id.clone());
        self.store.save_user(&user).await?;

        tracing::info!(
            user_id = %user.id,
            subscription_id = %subscription.id,
            "Recurring subscription created"
        );
        Ok(WebhookOutcome::SubscriptionActivated)
    }
}
