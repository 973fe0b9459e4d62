//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

use crate::error::AppError;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `NOTIFIER_URL` (optional): notifier gateway endpoint for email/push
///   fan-out; when unset only in-app notifications are written
/// - `NOTIFIER_SECRET` (optional): HMAC secret for signing gateway payloads
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default)]
    pub notifier_url: Option<String>,

    #[serde(default)]
    pub notifier_secret: Option<String>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// Validate the notifier gateway URL, if one is configured.
    ///
    /// # Rules
    ///
    /// - Must be a valid URL
    /// - Must be HTTPS (HTTP allowed for localhost during development)
    pub fn validate_notifier_url(&self) -> Result<(), AppError> {
        let Some(ref raw) = self.notifier_url else {
            return Ok(());
        };

        let parsed = url::Url::parse(raw)
            .map_err(|_| AppError::InvalidRequest("Invalid NOTIFIER_URL".to_string()))?;

        match parsed.scheme() {
            "https" => Ok(()),
            "http" => {
                // Allow HTTP for localhost/127.0.0.1 (testing)
                if matches!(
                    parsed.host_str(),
                    Some("localhost") | Some("127.0.0.1") | Some("0.0.0.0")
                ) {
                    Ok(())
                } else {
                    Err(AppError::InvalidRequest(
                        "NOTIFIER_URL must use HTTPS outside localhost".to_string(),
                    ))
                }
            }
            _ => Err(AppError::InvalidRequest(
                "NOTIFIER_URL must use HTTP or HTTPS".to_string(),
            )),
        }
    }
}
