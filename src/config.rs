// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Secrets (JWT signing key, Mollie API key) are read once at startup and
//! cached in memory for the lifetime of the process.

use std::env;

/// Deployment environment. In `Dev` no webhook URL is registered with Mollie
/// (the provider cannot reach a local machine) and the mock webhook trigger
/// is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Production,
}

impl Environment {
    fn from_str(value: &str) -> Self {
        match value {
            "dev" => Environment::Dev,
            _ => Environment::Production,
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment variables (non-sensitive) ---
    /// Public base URL of this deployment (redirect and webhook URLs)
    pub app_url: String,
    /// Google sign-in OAuth client ID (public)
    pub google_client_id: String,
    /// GCP project ID for Firestore
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Deployment environment flag
    pub env: Environment,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_secret: Vec<u8>,
    /// Mollie API key
    pub mollie_api_key: String,

    // --- Mollie payment strings ---
    /// Base URL of the Mollie API (overridable for tests)
    pub mollie_api_url: String,
    /// Description attached to the first one-off payment
    pub mollie_first_description: String,
    /// Description attached to the recurring subscription
    pub mollie_subscription_description: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            app_url: env::var("APP_URL").map_err(|_| ConfigError::Missing("APP_URL"))?,
            google_client_id: env::var("SIGN_IN_WITH_GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("SIGN_IN_WITH_GOOGLE_CLIENT_ID"))?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            env: Environment::from_str(&env::var("ENV").unwrap_or_default()),

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| ConfigError::Missing("JWT_SECRET"))?
                .into_bytes(),
            mollie_api_key: env::var("MOLLIE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("MOLLIE_API_KEY"))?,

            mollie_api_url: env::var("MOLLIE_API_URL")
                .unwrap_or_else(|_| "https://api.mollie.com/v2".to_string()),
            mollie_first_description: env::var("MOLLIE_FIRST_DESCRIPTION")
                .unwrap_or_else(|_| "Course subscription - first payment".to_string()),
            mollie_subscription_description: env::var("MOLLIE_SUBSCRIPTION_DESCRIPTION")
                .unwrap_or_else(|_| "Course subscription".to_string()),
        })
    }

    /// Webhook URL to register on outbound Mollie payloads.
    ///
    /// `None` in dev: Mollie cannot reach a locally running server, so dev
    /// payments are created without a webhook and the mock trigger is used
    /// instead.
    pub fn webhook_url(&self) -> Option<String> {
        match self.env {
            Environment::Dev => None,
            Environment::Production => Some(format!("{}/mollie/webhook", self.app_url)),
        }
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            app_url: "http://localhost:8080".to_string(),
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            env: Environment::Dev,
            jwt_secret: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            mollie_api_key: "test_mollie_key".to_string(),
            mollie_api_url: "https://api.mollie.com/v2".to_string(),
            mollie_first_description: "Test first payment".to_string(),
            mollie_subscription_description: "Test subscription".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_url_suppressed_in_dev() {
        let mut config = Config::test_default();
        assert_eq!(config.webhook_url(), None);

        config.env = Environment::Production;
        assert_eq!(
            config.webhook_url(),
            Some("http://localhost:8080/mollie/webhook".to_string())
        );
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(Environment::from_str("dev"), Environment::Dev);
        assert_eq!(Environment::from_str("production"), Environment::Production);
        assert_eq!(Environment::from_str(""), Environment::Production);
    }
}
