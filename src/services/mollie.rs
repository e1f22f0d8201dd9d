// SPDX-License-Identifier: MIT

//! Mollie API client for customers, payments, mandates and subscriptions.
//!
//! Handles:
//! - Lazy customer creation on first payment
//! - One-off "first" payments with a hosted checkout redirect
//! - Mandate lookup before creating a recurring subscription
//! - Subscription creation and cancellation

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed monthly subscription price.
pub const SUBSCRIPTION_PRICE_EUR: &str = "10.00";

/// Mollie API client.
#[derive(Clone)]
pub struct MollieClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MollieClient {
    /// Create a new Mollie client.
    ///
    /// `base_url` is normally `https://api.mollie.com/v2`; tests point it at
    /// a local mock server.
    pub fn new(base_url: String, api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url,
            api_key,
        }
    }

    /// Create a customer from the user's profile fields.
    pub async fn create_customer(&self, email: &str, name: &str) -> Result<Customer, AppError> {
        let url = format!("{}/customers", self.base_url);

        let body = serde_json::json!({
            "email": email,
            "name": name,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::MollieApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Fetch a payment (transaction) by id.
    pub async fn get_payment(&self, payment_id: &str) -> Result<Payment, AppError> {
        let url = format!("{}/payments/{}", self.base_url, payment_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::MollieApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Create a one-off payment; the response carries the hosted checkout URL.
    pub async fn create_payment(&self, request: &CreatePayment) -> Result<Payment, AppError> {
        let url = format!("{}/payments", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::MollieApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// List a customer's mandates.
    pub async fn list_mandates(&self, customer_id: &str) -> Result<Vec<Mandate>, AppError> {
        let url = format!("{}/customers/{}/mandates", self.base_url, customer_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::MollieApi(e.to_string()))?;

        let listing: MandateListing = self.check_response_json(response).await?;
        Ok(listing.embedded.mandates)
    }

    /// Create a recurring subscription for a customer.
    pub async fn create_subscription(
        &self,
        customer_id: &str,
        request: &CreateSubscription,
    ) -> Result<Subscription, AppError> {
        let url = format!("{}/customers/{}/subscriptions", self.base_url, customer_id);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::MollieApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Cancel (delete) a customer's subscription.
    pub async fn cancel_subscription(
        &self,
        customer_id: &str,
        subscription_id: &str,
    ) -> Result<(), AppError> {
        let url = format!(
            "{}/customers/{}/subscriptions/{}",
            self.base_url, customer_id, subscription_id
        );

        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::MollieApi(e.to_string()))?;

        self.check_response(response).await
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::MollieApi(format!("HTTP {}: {}", status, body)))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::MollieApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::MollieApi(format!("JSON parse error: {}", e)))
    }
}

/// Money amount in Mollie's wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Amount {
    pub currency: String,
    pub value: String,
}

impl Amount {
    /// The fixed monthly subscription price.
    pub fn subscription_price() -> Self {
        Self {
            currency: "EUR".to_string(),
            value: SUBSCRIPTION_PRICE_EUR.to_string(),
        }
    }
}

/// Customer creation response.
#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
}

/// One-off payment request.
///
/// `webhook_url` is an explicit optional field: it is omitted from the wire
/// payload in dev, where Mollie cannot reach the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayment {
    pub amount: Amount,
    pub customer_id: String,
    pub sequence_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    pub redirect_url: String,
}

/// Payment (transaction) response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub sequence_type: String,
    #[serde(default)]
    pub customer_id: String,
    #[serde(rename = "_links", default)]
    pub links: PaymentLinks,
}

impl Payment {
    /// Hosted checkout URL from the creation response.
    pub fn checkout_url(&self) -> Option<&str> {
        self.links.checkout.as_ref().map(|l| l.href.as_str())
    }
}

/// `_links` object on a payment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentLinks {
    pub checkout: Option<Link>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

/// A customer mandate (authorization for recurring charges).
#[derive(Debug, Clone, Deserialize)]
pub struct Mandate {
    pub id: String,
    pub status: String,
}

impl Mandate {
    /// Whether this mandate can back a recurring subscription.
    pub fn is_chargeable(&self) -> bool {
        self.status == "pending" || self.status == "valid"
    }
}

#[derive(Debug, Deserialize)]
struct MandateListing {
    #[serde(rename = "_embedded")]
    embedded: EmbeddedMandates,
}

#[derive(Debug, Deserialize)]
struct EmbeddedMandates {
    mandates: Vec<Mandate>,
}

/// Recurring subscription request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscription {
    pub amount: Amount,
    pub interval: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

/// Subscription creation response.
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
}
