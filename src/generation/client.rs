//! HTTP client for the external vision-capable generation service.

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

/// A generation request constrained by a named closed response schema.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub file_uri: String,
    pub mime_type: String,
    pub prompt: String,
    pub schema_name: &'static str,
    pub response_schema: Value,
}

/// Seam to the external service so tests can substitute a scripted model.
///
/// Upload and generation are separate calls; the upload yields an opaque
/// file reference consumed by the generation call.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Upload an image, returning an opaque file reference.
    async fn upload_image(&self, path: &Path, mime_type: &str) -> AppResult<String>;

    /// Run one generation call; returns the raw model text.
    async fn generate(&self, request: &GenerationRequest) -> AppResult<String>;
}

/// Gemini-style client: raw-bytes file upload, then a generateContent call
/// carrying the file reference, the prompt, and the response schema.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
        timeout_secs: u64,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("snapchef/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url,
            model,
            api_key,
        })
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn upload_image(&self, path: &Path, mime_type: &str) -> AppResult<String> {
        let bytes = tokio::fs::read(path).await?;
        let url = format!("{}/upload/v1beta/files?key={}", self.base_url, self.api_key);

        let response = self
            .http
            .post(&url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("Content-Type", mime_type.to_string())
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("image upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "image upload returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("image upload returned invalid JSON: {}", e)))?;
        body.pointer("/file/uri")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::Upstream("image upload response missing file.uri".to_string()))
    }

    async fn generate(&self, request: &GenerationRequest) -> AppResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        tracing::debug!(schema = request.schema_name, "submitting generation request");

        let body = json!({
            "contents": [{
                "parts": [
                    { "fileData": { "mimeType": request.mime_type, "fileUri": request.file_uri } },
                    { "text": request.prompt }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema,
            }
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("generation call failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "generation call returned {}",
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("generation response was not JSON: {}", e)))?;
        payload
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::Upstream("generation response missing candidate text".to_string())
            })
    }
}
