//! Azure OpenAI service for coin image analysis
//!
//! This module handles communication with an Azure OpenAI chat completions
//! deployment using REST. Images are sent inline as base64 data URLs.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use std::time::Duration;

use super::credential::AzureCredential;
use super::provider::{ImageUpload, ProviderError, VisionProvider};
use crate::config::{AzureOpenAiConfig, CredentialKind};
use crate::schemas::azure::{
    AzureErrorResponse, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ContentPart,
    ImageUrl,
};
use crate::utils::preview;

// ============================================================================
// Prompts
// ============================================================================

const SYSTEM_PROMPT: &str = "You are a professional numismatist and coin expert. Your task is to \
analyze coin images and provide detailed, accurate information about them. You MUST respond with \
ONLY valid JSON in the exact format specified. Do not include any explanatory text before or after \
the JSON. If you cannot determine certain information, use \"unknown\" as the value. Be thorough in \
your analysis and provide historical context when possible.";

const ANALYSIS_PROMPT: &str = r#"Analyze this coin image and return ONLY a JSON object in this exact format:

{
  "basic_info": {
    "released_year": "1975",
    "country": "United States",
    "denomination": "1 cent",
    "composition": "95% copper, 5% zinc"
  },
  "value_assessment": {
    "collector_value": "low collector value",
    "rarity": "common"
  },
  "description": "This is a Lincoln cent featuring Abraham Lincoln. It has been minted since 1909.",
  "historical_context": "Introduced to commemorate Lincoln's 100th birthday...",
  "technical_details": {
    "mint_mark": "D",
    "diameter_mm": "19.05",
    "composition": "copper-plated zinc"
  }
}

IMPORTANT: Return ONLY the JSON object. Do not include any markdown formatting, code blocks, or explanatory text. If any field cannot be determined from the image, use "unknown" as the value. Ensure all string values are properly quoted."#;

/// Characters of a raw reply written to the log
const REPLY_LOG_CHARS: usize = 1000;

// ============================================================================
// Azure OpenAI Service
// ============================================================================

/// Client for one Azure OpenAI deployment
#[derive(Debug)]
pub struct AzureOpenAiService {
    client: Client,
    api_url: String,
    deployment: String,
    credential: AzureCredential,
    timeout_seconds: u64,
    max_tokens: u32,
    temperature: f32,
}

impl AzureOpenAiService {
    /// Create a service from configuration
    ///
    /// Fails with [`ProviderError::NotConfigured`] when the endpoint or every
    /// credential is missing.
    pub fn new(config: &AzureOpenAiConfig) -> Result<Self, ProviderError> {
        let api_url = config.api_url().ok_or_else(|| {
            ProviderError::NotConfigured("AZURE_OPENAI_ENDPOINT is not set".to_string())
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        let credential = AzureCredential::from_config(config, client.clone()).ok_or_else(|| {
            ProviderError::NotConfigured(
                "set AZURE_OPENAI_API_KEY or AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET"
                    .to_string(),
            )
        })?;

        tracing::info!(
            deployment = %config.deployment_name,
            credential = %credential.kind(),
            timeout_seconds = config.request_timeout_seconds,
            "Initialized Azure OpenAI service"
        );

        Ok(Self {
            client,
            api_url,
            deployment: config.deployment_name.clone(),
            credential,
            timeout_seconds: config.request_timeout_seconds,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn credential_kind(&self) -> CredentialKind {
        self.credential.kind()
    }

    /// Build the chat request for one image
    pub fn build_analysis_request(&self, image: &ImageUpload) -> ChatCompletionRequest {
        let data_url = format!(
            "data:{};base64,{}",
            image.content_type,
            STANDARD.encode(&image.bytes)
        );

        ChatCompletionRequest {
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user_parts(vec![
                    ContentPart::Text {
                        text: ANALYSIS_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url,
                            detail: None,
                        },
                    },
                ]),
            ],
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
        }
    }

    /// Send a chat request and return the content of the first choice
    pub async fn complete(&self, request: &ChatCompletionRequest) -> Result<String, ProviderError> {
        let auth = self.credential.auth_header().await?;

        tracing::debug!(
            deployment = %self.deployment,
            url = %self.api_url,
            credential = %self.credential.kind(),
            "Calling Azure OpenAI chat completions API"
        );

        let response = self
            .client
            .post(&self.api_url)
            .header(auth.name, &auth.value)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %preview(&body, REPLY_LOG_CHARS), "Azure OpenAI API error");

            let message = serde_json::from_str::<AzureErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, body = %preview(&body, REPLY_LOG_CHARS), "Failed to parse Azure OpenAI response");
            ProviderError::UnexpectedResponse(e.to_string())
        })?;

        let content = completion
            .first_content()
            .ok_or_else(|| ProviderError::UnexpectedResponse("no choices returned".to_string()))?;

        tracing::info!(raw_reply = %preview(&content, REPLY_LOG_CHARS), "Raw model reply");

        Ok(content)
    }

    /// Send plain chat messages
    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let request = ChatCompletionRequest {
            messages,
            max_tokens: Some(max_tokens),
            temperature: Some(self.temperature),
        };
        self.complete(&request).await
    }

    fn map_transport_error(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            tracing::error!(timeout_seconds = self.timeout_seconds, "Timeout while communicating with Azure OpenAI API");
            ProviderError::Timeout(self.timeout_seconds)
        } else {
            ProviderError::Http(error)
        }
    }
}

#[async_trait]
impl VisionProvider for AzureOpenAiService {
    async fn analyze_image(&self, image: &ImageUpload) -> Result<String, ProviderError> {
        tracing::debug!(
            content_type = %image.content_type,
            size_bytes = image.len(),
            "Sending image to Azure OpenAI"
        );
        let request = self.build_analysis_request(image);
        self.complete(&request).await
    }

    fn model_name(&self) -> &str {
        &self.deployment
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::azure::MessageContent;

    fn configured() -> AzureOpenAiConfig {
        AzureOpenAiConfig {
            endpoint: Some("https://coins.openai.azure.com".to_string()),
            api_key: Some("test-key".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_service_creation() {
        let service = AzureOpenAiService::new(&configured()).expect("Should create service");
        assert_eq!(service.model_name(), "gpt-4o");
        assert_eq!(service.credential_kind(), CredentialKind::ApiKey);
        assert!(service.api_url().ends_with("/chat/completions?api-version=2024-02-15-preview"));
    }

    #[test]
    fn test_missing_endpoint() {
        let config = AzureOpenAiConfig {
            endpoint: None,
            ..configured()
        };
        assert!(matches!(
            AzureOpenAiService::new(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_missing_credential() {
        let config = AzureOpenAiConfig {
            api_key: None,
            ..configured()
        };
        assert!(matches!(
            AzureOpenAiService::new(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_analysis_request_embeds_image() {
        let service = AzureOpenAiService::new(&configured()).unwrap();
        let image = ImageUpload::new(vec![0xff, 0xd8, 0xff], "image/jpeg");

        let request = service.build_analysis_request(&image);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.max_tokens, Some(1000));

        let MessageContent::Parts(parts) = &request.messages[1].content else {
            panic!("expected multimodal user message");
        };
        match &parts[1] {
            ContentPart::ImageUrl { image_url } => {
                assert_eq!(image_url.url, "data:image/jpeg;base64,/9j/");
            }
            other => panic!("unexpected part: {:?}", other),
        }
    }
}
