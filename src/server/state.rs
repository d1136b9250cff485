//! Application state container
//!
//! This module defines the shared application state that is passed
//! to all request handlers via Axum's state extraction.

use crate::config::Settings;
use crate::normalizer::{Normalizer, NormalizerConfig};
use crate::services::{AzureOpenAiService, ProviderError, VisionProvider};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
///
/// Cheap to clone; every resource is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Vision model, absent when Azure OpenAI is not configured
    pub provider: Option<Arc<dyn VisionProvider>>,

    /// Reply normalizer, built once from settings
    pub normalizer: Arc<Normalizer>,

    /// Application start time (for uptime calculation)
    pub start_time: Instant,
}

impl AppState {
    /// Create the application state from settings
    ///
    /// A missing Azure configuration is logged and leaves the provider unset;
    /// any other provider construction error is fatal.
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        tracing::debug!(
            deployment = %settings.azure.deployment_name,
            credential = %settings.azure.credential_kind(),
            "Initializing Azure OpenAI service"
        );

        let provider: Option<Arc<dyn VisionProvider>> = match AzureOpenAiService::new(&settings.azure) {
            Ok(service) => Some(Arc::new(service) as Arc<dyn VisionProvider>),
            Err(ProviderError::NotConfigured(reason)) => {
                tracing::warn!(reason = %reason, "Azure OpenAI not configured, /analyze will be unavailable");
                None
            }
            Err(e) => return Err(e.into()),
        };

        Self::with_provider(settings, provider)
    }

    /// Create the application state with an explicit provider
    pub fn with_provider(
        settings: Settings,
        provider: Option<Arc<dyn VisionProvider>>,
    ) -> anyhow::Result<Self> {
        let normalizer_config = NormalizerConfig::default()
            .with_unknown_threshold(settings.normalizer.unknown_threshold)
            .with_log_preview_chars(settings.normalizer.log_preview_chars);
        let normalizer = Normalizer::new(normalizer_config)?;

        tracing::info!(
            provider_configured = provider.is_some(),
            unknown_threshold = settings.normalizer.unknown_threshold,
            "Application state initialized successfully"
        );

        Ok(Self {
            settings: Arc::new(settings),
            provider,
            normalizer: Arc::new(normalizer),
            start_time: Instant::now(),
        })
    }

    /// Get the application uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if the vision provider can be called
    pub fn is_provider_configured(&self) -> bool {
        self.provider.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_without_azure_configuration() {
        let state = AppState::new(Settings::default()).unwrap();
        assert!(!state.is_provider_configured());
        assert_eq!(state.normalizer.config().unknown_threshold, 0.5);
    }

    #[test]
    fn test_state_with_azure_configuration() {
        let mut settings = Settings::default();
        settings.azure.endpoint = Some("https://coins.openai.azure.com".to_string());
        settings.azure.api_key = Some("key".to_string());

        let state = AppState::new(settings).unwrap();
        assert!(state.is_provider_configured());
        assert_eq!(state.provider.as_ref().unwrap().model_name(), "gpt-4o");
    }
}
