//! Model Providers
//!
//! Defines the provider trait and the OpenAI-compatible chat completions
//! backend used in production.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};

use super::types::{ChatMessage, ModelError, ModelRequest};

/// Vision/text model provider
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send one request and return the reply text
    async fn complete(&self, request: ModelRequest) -> Result<String, ModelError>;
}

/// OpenAI chat completions provider
///
/// Works with any endpoint implementing `POST {base_url}/chat/completions`.
pub struct OpenAiProvider {
    client: reqwest::Client,
    /// API base URL (e.g. "https://api.openai.com/v1")
    base_url: String,
    api_key: String,
    /// Model used when a request does not name one
    default_model: String,
}

impl OpenAiProvider {
    pub fn new(
        base_url: &str,
        api_key: &str,
        default_model: &str,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            default_model: default_model.to_string(),
        })
    }

    fn build_body(&self, request: &ModelRequest) -> Value {
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let messages: Vec<Value> = request.messages.iter().map(message_json).collect();

        let mut body = json!({
            "model": model,
            "messages": messages,
        });

        if let Some(schema) = &request.response_schema {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.schema,
                }
            });
        }

        if request.web_search {
            body["web_search_options"] = json!({ "search_context_size": "medium" });
        }

        body
    }
}

/// Encode one message; messages with images use content parts
fn message_json(message: &ChatMessage) -> Value {
    if message.images.is_empty() {
        return json!({
            "role": message.role,
            "content": message.content,
        });
    }

    let mut parts = vec![json!({ "type": "text", "text": message.content })];
    for image in &message.images {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.data);
        parts.push(json!({
            "type": "image_url",
            "image_url": { "url": format!("data:{};base64,{}", image.mime_type, encoded) }
        }));
    }

    json!({
        "role": message.role,
        "content": parts,
    })
}

#[async_trait]
impl ModelClient for OpenAiProvider {
    async fn complete(&self, request: ModelRequest) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(&request);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout
                } else {
                    ModelError::Request(format!("Failed to call model API: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api { status, body });
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let content = result["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ModelError::InvalidResponse("Missing message content".to_string()))?;

        Ok(content.trim().to_string())
    }
}
