//! Transaction-classification backend, the hosted model boundary.
//!
//! Provides a `ClassifierBackend` trait with one production
//! implementation, `AnthropicClient`, which calls the Anthropic Messages
//! API. The system prompt is the entire rules engine; this module adds
//! no interpretation of its own. Upstream failures surface to the caller
//! unchanged, with no retry.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::ModelMessage;

/// Default Messages API endpoint.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Messages API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ============================================================================
// ClassifierBackend trait
// ============================================================================

/// Abstraction over the classification capability.
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Send `messages` with `system` as system context and return the
    /// model's reply text.
    async fn classify(
        &self,
        system: &str,
        messages: &[ModelMessage],
    ) -> Result<String, ClassifyError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

/// Classification call errors
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Missing API key")]
    MissingApiKey,
}

// ============================================================================
// Config
// ============================================================================

/// Anthropic client configuration
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
}

impl ClassifierConfig {
    pub fn new(api_key: Option<String>, model: String, max_tokens: u32) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .unwrap_or_default();

        Self {
            api_key,
            model,
            max_tokens,
        }
    }
}

// ============================================================================
// Messages API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [ModelMessage],
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// AnthropicClient
// ============================================================================

/// Anthropic Messages API client.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: Client,
    config: ClassifierConfig,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifyError> {
        Self::with_base_url(config, DEFAULT_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        config: ClassifierConfig,
        base_url: String,
    ) -> Result<Self, ClassifyError> {
        if config.api_key.is_empty() {
            return Err(ClassifyError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            config,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// One Messages API call. The reply is the text of the first content
    /// block; an empty content array is an error.
    async fn complete(
        &self,
        system: &str,
        messages: &[ModelMessage],
    ) -> Result<String, ClassifyError> {
        let url = format!("{}/v1/messages", self.base_url);

        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system,
            messages,
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Anthropic API error");

            return Err(ClassifyError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: MessagesResponse = response.json().await?;

        match body.content.into_iter().next() {
            Some(block) if !block.text.is_empty() => Ok(block.text),
            _ => Err(ClassifyError::EmptyResponse),
        }
    }
}

#[async_trait]
impl ClassifierBackend for AnthropicClient {
    async fn classify(
        &self,
        system: &str,
        messages: &[ModelMessage],
    ) -> Result<String, ClassifyError> {
        self.complete(system, messages).await
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_key: &str) -> ClassifierConfig {
        ClassifierConfig {
            api_key: api_key.to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 2048,
        }
    }

    fn mock_reply(text: &str) -> serde_json::Value {
        serde_json::json!({
            "content": [{ "type": "text", "text": text }],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn"
        })
    }

    #[tokio::test]
    async fn test_classify_sends_system_and_messages() {
        let mock_server = MockServer::start().await;
        let client = AnthropicClient::with_base_url(test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-api-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_json(serde_json::json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 2048,
                "system": "rules",
                "messages": [{ "role": "user", "content": "Where does Fiverr go?" }]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(mock_reply("Contractor Advertising (6120).")),
            )
            .mount(&mock_server)
            .await;

        let messages = vec![ModelMessage::new("user", "Where does Fiverr go?")];
        let result = client.classify("rules", &messages).await;

        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result.err());
        assert_eq!(result.unwrap(), "Contractor Advertising (6120).");
    }

    #[tokio::test]
    async fn test_classify_maps_api_error() {
        let mock_server = MockServer::start().await;
        let client = AnthropicClient::with_base_url(test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "type": "error",
                "error": { "type": "api_error", "message": "Internal server error" }
            })))
            .mount(&mock_server)
            .await;

        let result = client.classify("rules", &[]).await;

        match result {
            Err(ClassifyError::Api { code, message }) => {
                assert_eq!(code, 500);
                assert_eq!(message, "Internal server error");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_classify_does_not_retry_on_rate_limit() {
        let mock_server = MockServer::start().await;
        let client = AnthropicClient::with_base_url(test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client");

        // A single 429 must surface directly; expect exactly one request.
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "type": "error",
                "error": { "type": "rate_limit_error", "message": "Rate limit exceeded" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client.classify("rules", &[]).await;

        match result {
            Err(ClassifyError::Api { code, .. }) => assert_eq!(code, 429),
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_classify_empty_content_is_error() {
        let mock_server = MockServer::start().await;
        let client = AnthropicClient::with_base_url(test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "content": [] })),
            )
            .mount(&mock_server)
            .await;

        let result = client.classify("rules", &[]).await;

        assert!(matches!(result, Err(ClassifyError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_missing_api_key_rejected_at_construction() {
        let result = AnthropicClient::new(test_config(""));

        assert!(matches!(result, Err(ClassifyError::MissingApiKey)));
    }
}
