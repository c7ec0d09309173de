//! Till configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TILL_API_BASE_URL` - Base URL of the remote order service
//!
//! ## Optional
//! - `TILL_DATABASE_URL` - Local store location (default: `sqlite://till.db`,
//!   `memory:` for a throwaway in-process store)
//! - `TILL_HTTP_TIMEOUT_SECS` - Remote call timeout (default: 30)
//! - `TILL_GST_PERCENT` - GST surcharge applied at checkout (default: 5)
//! - `TILL_ADVANCED_FEATURES` - Grants history removal (default: false)
//! - `TILL_LOG_FORMAT` - `text` or `json` (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Capabilities granted to this installation.
///
/// Read once at startup and handed to the components that gate on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureGrant {
    advanced: bool,
}

impl FeatureGrant {
    /// No optional features.
    #[must_use]
    pub const fn basic() -> Self {
        Self { advanced: false }
    }

    /// The advanced feature set.
    #[must_use]
    pub const fn advanced() -> Self {
        Self { advanced: true }
    }

    /// Whether orders may be deleted from history.
    #[must_use]
    pub const fn allows_order_removal(self) -> bool {
        self.advanced
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Till application configuration.
#[derive(Debug, Clone)]
pub struct TillConfig {
    /// Remote order service base URL
    pub api_base_url: Url,
    /// Local store location
    pub database_url: String,
    /// Timeout for each remote call
    pub http_timeout: Duration,
    /// GST percentage applied by billing
    pub gst_percent: Decimal,
    /// Optional capabilities
    pub features: FeatureGrant,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl TillConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let api_base_url = env
            .required("TILL_API_BASE_URL")?
            .parse::<Url>()
            .map_err(|e| invalid("TILL_API_BASE_URL", &e))?;
        let database_url = env.or_default("TILL_DATABASE_URL", "sqlite://till.db");
        let http_timeout = env
            .or_default("TILL_HTTP_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| invalid("TILL_HTTP_TIMEOUT_SECS", &e))?;
        let gst_percent = env
            .or_default("TILL_GST_PERCENT", "5")
            .parse::<Decimal>()
            .map_err(|e| invalid("TILL_GST_PERCENT", &e))?;
        if gst_percent.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "TILL_GST_PERCENT".to_string(),
                "must not be negative".to_string(),
            ));
        }
        let features = if parse_bool(&env.or_default("TILL_ADVANCED_FEATURES", "false"))
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "TILL_ADVANCED_FEATURES".to_string(),
                    "expected true or false".to_string(),
                )
            })? {
            FeatureGrant::advanced()
        } else {
            FeatureGrant::basic()
        };
        let log_format = match env.or_default("TILL_LOG_FORMAT", "text").as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "TILL_LOG_FORMAT".to_string(),
                    format!("expected text or json, got {other}"),
                ));
            }
        };
        let sentry_dsn = env.optional("SENTRY_DSN");

        Ok(Self {
            api_base_url,
            database_url,
            http_timeout,
            gst_percent,
            features,
            log_format,
            sentry_dsn,
        })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable; blank counts as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}

fn invalid(key: &str, err: &impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), err.to_string())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
