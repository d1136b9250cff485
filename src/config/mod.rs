//! Configuration management module
//!
//! This module handles loading and validating application configuration
//! from environment variables and .env files.

pub mod azure;
pub mod settings;

pub use azure::{AzureOpenAiConfig, CredentialKind, COGNITIVE_SERVICES_SCOPE, DEFAULT_AUTHORITY_HOST};
pub use settings::{Environment, NormalizerSettings, Settings};
