//! Azure OpenAI configuration
//!
//! Connection settings for the Azure OpenAI deployment and the credentials
//! used to reach it.

use serde::{Deserialize, Serialize};

/// Default Entra ID authority
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// OAuth2 scope for Azure Cognitive Services
pub const COGNITIVE_SERVICES_SCOPE: &str = "https://cognitiveservices.azure.com/.default";

/// Which credential the service will authenticate with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    ApiKey,
    ClientSecret,
    None,
}

impl std::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialKind::ApiKey => write!(f, "api_key"),
            CredentialKind::ClientSecret => write!(f, "client_secret"),
            CredentialKind::None => write!(f, "none"),
        }
    }
}

/// Azure OpenAI deployment settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AzureOpenAiConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: Option<String>,
    pub deployment_name: String,
    pub api_version: String,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    // Entra ID client credentials
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    pub authority_host: String,

    pub request_timeout_seconds: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AzureOpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            deployment_name: "gpt-4o".to_string(),
            api_version: "2024-02-15-preview".to_string(),
            api_key: None,
            tenant_id: None,
            client_id: None,
            client_secret: None,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            request_timeout_seconds: 90,
            max_tokens: 1000,
            temperature: 0.1,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AzureOpenAiConfig {
    pub fn endpoint(&self) -> Option<&str> {
        non_empty(&self.endpoint)
    }

    pub fn api_key(&self) -> Option<&str> {
        non_empty(&self.api_key)
    }

    /// Client credentials, if all three parts are present
    pub fn client_credentials(&self) -> Option<(&str, &str, &str)> {
        Some((
            non_empty(&self.tenant_id)?,
            non_empty(&self.client_id)?,
            non_empty(&self.client_secret)?,
        ))
    }

    /// Credential that will be used; an API key takes precedence
    pub fn credential_kind(&self) -> CredentialKind {
        if self.api_key().is_some() {
            CredentialKind::ApiKey
        } else if self.client_credentials().is_some() {
            CredentialKind::ClientSecret
        } else {
            CredentialKind::None
        }
    }

    /// Whether an endpoint and a credential are both available
    pub fn is_configured(&self) -> bool {
        self.endpoint().is_some() && self.credential_kind() != CredentialKind::None
    }

    /// Chat completions URL of the deployment
    pub fn api_url(&self) -> Option<String> {
        self.endpoint().map(|endpoint| {
            format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint.trim_end_matches('/'),
                self.deployment_name,
                self.api_version
            )
        })
    }

    /// Entra ID token URL for the configured tenant
    pub fn token_url(&self) -> Option<String> {
        non_empty(&self.tenant_id).map(|tenant| {
            format!(
                "{}/{}/oauth2/v2.0/token",
                self.authority_host.trim_end_matches('/'),
                tenant
            )
        })
    }
}
