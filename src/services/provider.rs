//! Vision provider abstraction
//!
//! Handlers talk to the model through [`VisionProvider`] so the transport can
//! be swapped out, e.g. for a stub in tests.

use async_trait::async_trait;
use thiserror::Error;

use super::credential::CredentialError;

/// One uploaded image
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    /// Declared MIME type, always `image/*` once validated
    pub content_type: String,
    pub filename: Option<String>,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Errors that can occur when calling the vision provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Azure OpenAI configuration not complete: {0}")]
    NotConfigured(String),

    #[error("Request timeout - provider took longer than {0} seconds to respond")]
    Timeout(u64),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response format from provider: {0}")]
    UnexpectedResponse(String),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

/// A model that can describe a coin image
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Send the image with the analysis prompt and return the raw reply text
    ///
    /// The reply may be empty; deciding what that means is up to the caller.
    async fn analyze_image(&self, image: &ImageUpload) -> Result<String, ProviderError>;

    /// Model or deployment name reported to clients
    fn model_name(&self) -> &str;
}
