//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use coin_analyzer::{
    config::Settings,
    server::AppState,
    services::{ImageUpload, ProviderError, VisionProvider},
};
use serde_json::{json, Value};

pub const MOCK_ACCESS_TOKEN: &str = "mock-access-token";

// ============================================================================
// Stub vision provider
// ============================================================================

/// What the stub provider answers
pub enum StubReply {
    Text(String),
    Timeout,
    Api(u16, String),
}

/// Provider that returns a canned reply and records what it received
pub struct StubProvider {
    reply: StubReply,
    pub calls: AtomicUsize,
    pub last_upload: Mutex<Option<ImageUpload>>,
}

impl StubProvider {
    pub fn new(reply: StubReply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last_upload: Mutex::new(None),
        })
    }

    pub fn text(reply: impl Into<String>) -> Arc<Self> {
        Self::new(StubReply::Text(reply.into()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionProvider for StubProvider {
    async fn analyze_image(&self, image: &ImageUpload) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_upload.lock().unwrap() = Some(image.clone());

        match &self.reply {
            StubReply::Text(text) => Ok(text.clone()),
            StubReply::Timeout => Err(ProviderError::Timeout(90)),
            StubReply::Api(status, message) => Err(ProviderError::Api {
                status: *status,
                message: message.clone(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "stub-vision"
    }
}

/// App state wired to a stub provider
pub fn state_with(provider: Arc<StubProvider>) -> AppState {
    AppState::with_provider(Settings::default(), Some(provider as Arc<dyn VisionProvider>))
        .unwrap()
}

/// App state without any provider, as when Azure is not configured
pub fn unconfigured_state() -> AppState {
    AppState::new(Settings::default()).unwrap()
}

// ============================================================================
// Multipart bodies
// ============================================================================

pub const BOUNDARY: &str = "coin-analyzer-test-boundary";

/// Build a multipart/form-data body with a single file field
pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

// ============================================================================
// Mock Azure OpenAI + Entra ID server
// ============================================================================

/// How the mock chat completions endpoint answers
#[derive(Clone)]
pub enum MockReply {
    /// 200 with one choice holding this content
    Content(String),
    /// 200 with an empty choices array
    NoChoices,
    /// Non-success status with an Azure error body
    Error(u16, String),
    /// Sleep before answering with "{}"
    Delay(Duration),
}

/// Request seen by the mock chat endpoint
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub deployment: String,
    pub api_version: Option<String>,
    pub api_key: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

pub struct MockAzure {
    pub base_url: String,
    reply: Mutex<MockReply>,
    pub chat_requests: Mutex<Vec<RecordedRequest>>,
    pub token_requests: Mutex<Vec<HashMap<String, String>>>,
}

impl MockAzure {
    pub fn set_reply(&self, reply: MockReply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn last_chat_request(&self) -> RecordedRequest {
        self.chat_requests.lock().unwrap().last().cloned().unwrap()
    }

    pub fn token_request_count(&self) -> usize {
        self.token_requests.lock().unwrap().len()
    }
}

/// Start the mock server on an ephemeral port
pub async fn spawn_mock_azure(reply: MockReply) -> Arc<MockAzure> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mock = Arc::new(MockAzure {
        base_url: format!("http://{}", addr),
        reply: Mutex::new(reply),
        chat_requests: Mutex::new(Vec::new()),
        token_requests: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route(
            "/openai/deployments/:deployment/chat/completions",
            post(mock_chat_completions),
        )
        .route("/:tenant/oauth2/v2.0/token", post(mock_token))
        .with_state(mock.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    mock
}

async fn mock_chat_completions(
    State(mock): State<Arc<MockAzure>>,
    Path(deployment): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    mock.chat_requests.lock().unwrap().push(RecordedRequest {
        deployment,
        api_version: query.get("api-version").cloned(),
        api_key: header("api-key"),
        authorization: header("authorization"),
        body,
    });

    let reply = mock.reply.lock().unwrap().clone();
    match reply {
        MockReply::Content(content) => Json(json!({
            "id": "chatcmpl-mock",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 812, "completion_tokens": 120, "total_tokens": 932}
        }))
        .into_response(),
        MockReply::NoChoices => Json(json!({"id": "chatcmpl-mock", "choices": []})).into_response(),
        MockReply::Error(status, message) => (
            StatusCode::from_u16(status).unwrap(),
            Json(json!({"error": {"code": "MockError", "message": message}})),
        )
            .into_response(),
        MockReply::Delay(delay) => {
            tokio::time::sleep(delay).await;
            Json(json!({})).into_response()
        }
    }
}

async fn mock_token(
    State(mock): State<Arc<MockAzure>>,
    Path(_tenant): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let valid = form.get("grant_type").map(String::as_str) == Some("client_credentials")
        && form.get("client_secret").map(String::as_str) == Some("client-secret");
    mock.token_requests.lock().unwrap().push(form);

    if !valid {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_client"})),
        )
            .into_response();
    }

    Json(json!({
        "access_token": MOCK_ACCESS_TOKEN,
        "expires_in": 3600,
        "token_type": "Bearer"
    }))
    .into_response()
}

/// Settings pointing at the mock server with an API key
pub fn api_key_settings(mock: &MockAzure) -> Settings {
    let mut settings = Settings::default();
    settings.azure.endpoint = Some(format!("{}/", mock.base_url));
    settings.azure.api_key = Some("test-api-key".to_string());
    settings
}

/// Settings pointing at the mock server with Entra ID client credentials
pub fn client_secret_settings(mock: &MockAzure, client_secret: &str) -> Settings {
    let mut settings = Settings::default();
    settings.azure.endpoint = Some(mock.base_url.clone());
    settings.azure.tenant_id = Some("tenant-123".to_string());
    settings.azure.client_id = Some("client-abc".to_string());
    settings.azure.client_secret = Some(client_secret.to_string());
    settings.azure.authority_host = mock.base_url.clone();
    settings
}
