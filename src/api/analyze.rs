//! Coin analysis endpoint
//!
//! POST /analyze accepts a multipart form with an `image` field, forwards
//! the image to the vision model and normalizes the reply into a
//! [`CoinRecord`](crate::schemas::coin::CoinRecord).

use axum::{
    extract::{Multipart, State},
    Json,
};
use chrono::Utc;
use std::time::Instant;

use crate::error::ApiError;
use crate::schemas::coin::{AnalysisMetadata, AnalysisResponse};
use crate::server::state::AppState;
use crate::services::ImageUpload;

/// Name of the multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// Analyze a coin image
///
/// POST /analyze
pub async fn analyze_coin(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let provider = state.provider.clone().ok_or_else(|| {
        ApiError::Configuration(
            "Azure OpenAI configuration not complete. Please set AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_API_KEY \
             (or AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET)"
                .to_string(),
        )
    })?;

    let image = read_image(&mut multipart).await?;
    let start = Instant::now();

    tracing::info!(
        filename = %image.filename.as_deref().unwrap_or("-"),
        content_type = %image.content_type,
        size_bytes = image.len(),
        "Analyzing coin image"
    );

    let raw_reply = provider.analyze_image(&image).await?;
    let normalized = state.normalizer.normalize(&raw_reply)?;

    tracing::info!(
        structured = normalized.diagnostics.structured,
        strategy = ?normalized.diagnostics.strategy,
        fallback_applied = normalized.diagnostics.fallback_applied,
        unknown_fields = normalized.diagnostics.unknown_fields,
        "Coin analysis normalized"
    );

    Ok(Json(AnalysisResponse {
        success: true,
        timestamp: Utc::now().to_rfc3339(),
        coin_analysis: normalized.record,
        metadata: AnalysisMetadata {
            model_used: provider.model_name().to_string(),
            image_filename: image.filename,
            image_size_bytes: image.bytes.len(),
            processing_time_ms: start.elapsed().as_millis() as u64,
            parsing: normalized.diagnostics,
        },
    }))
}

/// Pull the image field out of the form and validate it
async fn read_image(multipart: &mut Multipart) -> Result<ImageUpload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string).unwrap_or_default();
        if !content_type.starts_with("image/") {
            return Err(ApiError::InvalidRequest("File must be an image".to_string()));
        }

        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::InvalidRequest("Uploaded image is empty".to_string()));
        }

        let mut upload = ImageUpload::new(bytes.to_vec(), content_type);
        upload.filename = filename;
        return Ok(upload);
    }

    Err(ApiError::InvalidRequest(format!(
        "Missing '{}' field in multipart form",
        IMAGE_FIELD
    )))
}
