//! Debug endpoints
//!
//! Configuration report and a way to run the normalizer on arbitrary text
//! without calling the model. Secrets are never echoed, only whether they
//! are set.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::config::CredentialKind;
use crate::error::ApiError;
use crate::normalizer::Normalized;
use crate::server::state::AppState;

#[derive(Serialize)]
pub struct DebugResponse {
    pub azure_openai_api_key_set: bool,
    pub azure_openai_api_key_length: usize,
    pub azure_openai_endpoint: Option<String>,
    pub azure_openai_deployment_name: String,
    pub azure_openai_api_version: String,
    pub api_url: Option<String>,
    pub credential: CredentialKind,
    pub provider_configured: bool,
    pub request_timeout_seconds: u64,
    pub normalizer_unknown_threshold: f64,
    pub max_upload_bytes: usize,
}

/// GET /debug
pub async fn debug_info(State(state): State<AppState>) -> Json<DebugResponse> {
    let azure = &state.settings.azure;

    Json(DebugResponse {
        azure_openai_api_key_set: azure.api_key().is_some(),
        azure_openai_api_key_length: azure.api_key().map(str::len).unwrap_or(0),
        azure_openai_endpoint: azure.endpoint().map(str::to_string),
        azure_openai_deployment_name: azure.deployment_name.clone(),
        azure_openai_api_version: azure.api_version.clone(),
        api_url: azure.api_url(),
        credential: azure.credential_kind(),
        provider_configured: state.is_provider_configured(),
        request_timeout_seconds: azure.request_timeout_seconds,
        normalizer_unknown_threshold: state.normalizer.config().unknown_threshold,
        max_upload_bytes: state.settings.max_upload_bytes,
    })
}

#[derive(Debug, Deserialize)]
pub struct NormalizeRequest {
    pub text: String,
}

/// Normalize a raw reply supplied by the caller
///
/// POST /debug/normalize
pub async fn debug_normalize(
    State(state): State<AppState>,
    Json(request): Json<NormalizeRequest>,
) -> Result<Json<Normalized>, ApiError> {
    let normalized = state
        .normalizer
        .normalize(&request.text)
        .map_err(|e| ApiError::Unprocessable(e.to_string()))?;

    Ok(Json(normalized))
}
