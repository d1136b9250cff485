//! Application settings and configuration
//!
//! This module provides configuration management for the application,
//! loading settings from environment variables with sensible defaults.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

use super::azure::{AzureOpenAiConfig, DEFAULT_AUTHORITY_HOST};
use crate::normalizer::{DEFAULT_LOG_PREVIEW_CHARS, DEFAULT_UNKNOWN_THRESHOLD};

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[value(alias = "dev")]
    Development,
    #[value(alias = "stage")]
    Staging,
    #[value(alias = "prod")]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => anyhow::bail!("Invalid environment: {}. Expected: development, staging, or production", s),
        }
    }
}

/// Response normalizer tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NormalizerSettings {
    /// Fraction of unknown fields (0.0 to 1.0) that triggers the text fallback
    pub unknown_threshold: f64,
    /// Characters of a raw reply included in log events
    pub log_preview_chars: usize,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            unknown_threshold: DEFAULT_UNKNOWN_THRESHOLD,
            log_preview_chars: DEFAULT_LOG_PREVIEW_CHARS,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub log_level: String,

    // Server settings
    pub host: String,
    pub port: u16,

    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,

    // Azure OpenAI
    pub azure: AzureOpenAiConfig,

    // Response normalizer
    pub normalizer: NormalizerSettings,
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignored in production typically)
        dotenvy::dotenv().ok();

        let settings = Self {
            // App settings
            app_name: env_or_default("APP_NAME", "coin-analyzer"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: env_or_default("ENVIRONMENT", "development")
                .parse()
                .unwrap_or_default(),
            log_level: env_or_default("LOG_LEVEL", "info"),

            // Server settings
            host: env_or_default("HOST", "0.0.0.0"),
            port: env_or_default("PORT", "8000")
                .parse()
                .context("Invalid PORT value")?,
            max_upload_bytes: env_or_default("MAX_UPLOAD_BYTES", "20971520")
                .parse()
                .context("Invalid MAX_UPLOAD_BYTES value")?,

            // Azure OpenAI
            azure: AzureOpenAiConfig {
                endpoint: env::var("AZURE_OPENAI_ENDPOINT").ok(),
                deployment_name: env_or_default("AZURE_OPENAI_DEPLOYMENT_NAME", "gpt-4o"),
                api_version: env_or_default("AZURE_OPENAI_API_VERSION", "2024-02-15-preview"),
                api_key: env::var("AZURE_OPENAI_API_KEY").ok(),
                tenant_id: env::var("AZURE_TENANT_ID").ok(),
                client_id: env::var("AZURE_CLIENT_ID").ok(),
                client_secret: env::var("AZURE_CLIENT_SECRET").ok(),
                authority_host: env_or_default("AZURE_AUTHORITY_HOST", DEFAULT_AUTHORITY_HOST),
                request_timeout_seconds: env_or_default("AZURE_OPENAI_TIMEOUT_SECONDS", "90")
                    .parse()
                    .unwrap_or(90),
                max_tokens: env_or_default("AZURE_OPENAI_MAX_TOKENS", "1000")
                    .parse()
                    .unwrap_or(1000),
                temperature: env_or_default("AZURE_OPENAI_TEMPERATURE", "0.1")
                    .parse()
                    .unwrap_or(0.1),
            },

            // Response normalizer
            normalizer: NormalizerSettings {
                unknown_threshold: env_or_default("NORMALIZER_UNKNOWN_THRESHOLD", "0.5")
                    .parse()
                    .context("Invalid NORMALIZER_UNKNOWN_THRESHOLD value")?,
                log_preview_chars: env_or_default("NORMALIZER_LOG_PREVIEW_CHARS", "1000")
                    .parse()
                    .unwrap_or(DEFAULT_LOG_PREVIEW_CHARS),
            },
        };

        // Validate settings
        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("Port cannot be 0");
        }

        if self.max_upload_bytes == 0 {
            anyhow::bail!("MAX_UPLOAD_BYTES must be > 0");
        }

        if self.azure.request_timeout_seconds == 0 {
            anyhow::bail!("AZURE_OPENAI_TIMEOUT_SECONDS must be > 0");
        }

        if !(0.0..=1.0).contains(&self.normalizer.unknown_threshold) {
            anyhow::bail!(
                "NORMALIZER_UNKNOWN_THRESHOLD must be between 0.0 and 1.0, got {}",
                self.normalizer.unknown_threshold
            );
        }

        // Missing Azure settings are not fatal: the analyze endpoint reports them
        if self.azure.endpoint().is_none() {
            tracing::warn!("AZURE_OPENAI_ENDPOINT not found in environment variables");
        }
        if !self.azure.is_configured() && self.azure.endpoint().is_some() {
            tracing::warn!(
                "No Azure credential found: set AZURE_OPENAI_API_KEY or AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET"
            );
        }

        Ok(())
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get the server address string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "coin-analyzer".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: Environment::Development,
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 20 * 1024 * 1024,
            azure: AzureOpenAiConfig::default(),
            normalizer: NormalizerSettings::default(),
        }
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.app_name, "coin-analyzer");
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.azure.deployment_name, "gpt-4o");
        assert_eq!(settings.azure.request_timeout_seconds, 90);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_threshold_validation() {
        let mut settings = Settings::default();
        settings.normalizer.unknown_threshold = 1.5;
        assert!(settings.validate().is_err());
        settings.normalizer.unknown_threshold = 0.0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_server_addr() {
        let settings = Settings::default();
        assert_eq!(settings.server_addr(), "0.0.0.0:8000");
    }
}
