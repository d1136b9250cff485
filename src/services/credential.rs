//! Azure credentials
//!
//! Azure OpenAI accepts either a resource API key or an Entra ID bearer
//! token. Tokens are obtained with the OAuth2 client-credentials grant and
//! reused until shortly before they expire.

use std::time::{Duration, Instant};

use reqwest::Client;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::{AzureOpenAiConfig, CredentialKind, COGNITIVE_SERVICES_SCOPE};
use crate::schemas::azure::TokenResponse;

/// Refresh tokens this long before they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Errors raised while acquiring a credential
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token endpoint returned {status}: {message}")]
    TokenRequest { status: u16, message: String },

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

/// Header to attach to a provider request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub name: &'static str,
    pub value: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Entra ID service principal
pub struct ClientSecretCredential {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ClientSecretCredential {
    pub fn new(
        client: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: COGNITIVE_SERVICES_SCOPE.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// Return a valid access token, fetching a new one when needed
    pub async fn token(&self) -> Result<String, CredentialError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.token.clone());
        }

        tracing::debug!(token_url = %self.token_url, client_id = %self.client_id, "Requesting Entra ID token");

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CredentialError::TokenRequest {
                status: status.as_u16(),
                message: body,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| CredentialError::InvalidResponse(e.to_string()))?;
        if token.access_token.is_empty() {
            return Err(CredentialError::InvalidResponse("empty access_token".to_string()));
        }

        tracing::info!(expires_in = token.expires_in, "Acquired Entra ID token");

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });

        Ok(access_token)
    }
}

/// Credential used for Azure OpenAI requests
pub enum AzureCredential {
    ApiKey(String),
    ClientSecret(ClientSecretCredential),
}

impl std::fmt::Debug for AzureCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AzureCredential({})", self.kind())
    }
}

impl AzureCredential {
    /// Pick the credential from configuration; an API key takes precedence
    pub fn from_config(config: &AzureOpenAiConfig, client: Client) -> Option<Self> {
        if let Some(key) = config.api_key() {
            return Some(AzureCredential::ApiKey(key.to_string()));
        }

        let (_, client_id, client_secret) = config.client_credentials()?;
        let token_url = config.token_url()?;
        Some(AzureCredential::ClientSecret(ClientSecretCredential::new(
            client,
            token_url,
            client_id,
            client_secret,
        )))
    }

    pub fn kind(&self) -> CredentialKind {
        match self {
            AzureCredential::ApiKey(_) => CredentialKind::ApiKey,
            AzureCredential::ClientSecret(_) => CredentialKind::ClientSecret,
        }
    }

    /// Header carrying this credential
    pub async fn auth_header(&self) -> Result<AuthHeader, CredentialError> {
        match self {
            AzureCredential::ApiKey(key) => Ok(AuthHeader {
                name: "api-key",
                value: key.clone(),
            }),
            AzureCredential::ClientSecret(credential) => Ok(AuthHeader {
                name: "authorization",
                value: format!("Bearer {}", credential.token().await?),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_key_header() {
        let credential = AzureCredential::ApiKey("secret".to_string());
        let header = credential.auth_header().await.unwrap();
        assert_eq!(header.name, "api-key");
        assert_eq!(header.value, "secret");
    }

    #[test]
    fn test_from_config_prefers_api_key() {
        let config = AzureOpenAiConfig {
            api_key: Some("key".to_string()),
            tenant_id: Some("tenant".to_string()),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            ..Default::default()
        };
        let credential = AzureCredential::from_config(&config, Client::new()).unwrap();
        assert_eq!(credential.kind(), CredentialKind::ApiKey);
    }

    #[test]
    fn test_from_config_client_secret() {
        let config = AzureOpenAiConfig {
            tenant_id: Some("tenant".to_string()),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            ..Default::default()
        };
        let credential = AzureCredential::from_config(&config, Client::new()).unwrap();
        assert_eq!(credential.kind(), CredentialKind::ClientSecret);
        assert_eq!(format!("{:?}", credential), "AzureCredential(client_secret)");
    }

    #[test]
    fn test_from_config_without_credentials() {
        assert!(AzureCredential::from_config(&AzureOpenAiConfig::default(), Client::new()).is_none());
    }

    #[test]
    fn test_cached_token_freshness() {
        let fresh = CachedToken {
            token: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        };
        let stale = CachedToken {
            token: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        assert!(fresh.is_fresh());
        assert!(!stale.is_fresh());
    }
}
