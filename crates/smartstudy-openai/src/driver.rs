// OpenAI-compatible LLM Driver
//
// Non-streaming chat completions against any OpenAI-compatible endpoint
// (Groq by default). Failures are classified so the pipeline can tell an
// unreachable backend from a rejected model id.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use smartstudy_core::llm::{
    LlmCallConfig, LlmCompletionMetadata, LlmMessage, LlmResponse, ResponseFormat,
};
use smartstudy_core::{LlmDriver, LlmError};

use crate::types::{ChatMessage, ChatRequest, ChatResponse, ErrorEnvelope, ResponseFormatSpec};

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Error codes meaning the configured model id is unusable
const MODEL_REJECTION_CODES: [&str; 2] = ["model_decommissioned", "model_not_found"];

/// OpenAI-compatible chat completions driver
///
/// # Example
///
/// ```ignore
/// use smartstudy_openai::OpenAiCompatibleDriver;
///
/// let driver = OpenAiCompatibleDriver::from_env()?;
/// // or
/// let driver = OpenAiCompatibleDriver::new("your-api-key");
/// // or with custom endpoint
/// let driver = OpenAiCompatibleDriver::with_base_url("your-api-key", "http://localhost:8080/v1/chat/completions");
/// ```
#[derive(Clone)]
pub struct OpenAiCompatibleDriver {
    client: Client,
    api_key: String,
    api_url: String,
}

impl OpenAiCompatibleDriver {
    /// Create a driver for the default endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_API_URL)
    }

    /// Create a driver for a custom OpenAI-compatible endpoint
    pub fn with_base_url(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
        }
    }

    /// Bound every request by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> anyhow::Result<Self> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(self)
    }

    /// Create a driver from the environment
    ///
    /// Reads `LLM_API_KEY` (falling back to `GROQ_API_KEY`), `LLM_API_URL`
    /// and `LLM_TIMEOUT_SECS`.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("GROQ_API_KEY"))
            .context("LLM_API_KEY (or GROQ_API_KEY) environment variable not set")?;
        let api_url =
            std::env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let driver = Self::with_base_url(api_key, api_url);

        match std::env::var("LLM_TIMEOUT_SECS") {
            Ok(secs) => {
                let secs: u64 = secs
                    .parse()
                    .with_context(|| format!("Invalid LLM_TIMEOUT_SECS: {}", secs))?;
                driver.with_timeout(Duration::from_secs(secs))
            }
            Err(_) => Ok(driver),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn build_request(messages: Vec<LlmMessage>, config: &LlmCallConfig) -> ChatRequest {
        ChatRequest {
            model: config.model.clone(),
            messages: messages
                .into_iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str(),
                    content: m.content,
                })
                .collect(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            response_format: match config.response_format {
                ResponseFormat::JsonObject => Some(ResponseFormatSpec {
                    kind: "json_object",
                }),
                ResponseFormat::Text => None,
            },
            stream: false,
        }
    }

    fn classify_failure(status: StatusCode, body: &str, model: &str) -> LlmError {
        let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
        let message = envelope
            .as_ref()
            .map(|e| e.error.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.to_string());
        let code = envelope.as_ref().and_then(|e| e.error.code.as_deref());

        if code.is_some_and(|c| MODEL_REJECTION_CODES.contains(&c)) {
            return LlmError::ModelRejected {
                model: model.to_string(),
                message,
            };
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return LlmError::Unavailable(format!("{} ({})", message, status));
        }
        LlmError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl LlmDriver for OpenAiCompatibleDriver {
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        config: &LlmCallConfig,
    ) -> Result<LlmResponse, LlmError> {
        let request = Self::build_request(messages, config);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, timeout = e.is_timeout(), "Chat completion request failed");
                LlmError::unavailable(format!("Failed to send request: {}", e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::unavailable(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let err = Self::classify_failure(status, &body, &config.model);
            tracing::warn!(status = status.as_u16(), error = %err, "Chat completion rejected");
            return Err(err);
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::protocol(format!("Malformed completion body: {}", e)))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::protocol("Completion has no choices"))?;

        Ok(LlmResponse {
            text: choice.message.content.unwrap_or_default(),
            metadata: LlmCompletionMetadata {
                total_tokens: parsed.usage.as_ref().and_then(|u| u.total_tokens),
                prompt_tokens: parsed.usage.as_ref().and_then(|u| u.prompt_tokens),
                completion_tokens: parsed.usage.as_ref().and_then(|u| u.completion_tokens),
                model: parsed.model,
                finish_reason: choice.finish_reason,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let config = LlmCallConfig::new("llama-3.3-70b-versatile")
            .with_temperature(0.0)
            .json_object();
        let request = OpenAiCompatibleDriver::build_request(
            vec![LlmMessage::system("rules"), LlmMessage::user("hi")],
            &config,
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama-3.3-70b-versatile");
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_classify_failure() {
        let decommissioned = r#"{"error":{"message":"The model `llama3-70b-8192` has been decommissioned","type":"invalid_request_error","code":"model_decommissioned"}}"#;
        assert!(matches!(
            OpenAiCompatibleDriver::classify_failure(StatusCode::BAD_REQUEST, decommissioned, "llama3-70b-8192"),
            LlmError::ModelRejected { ref model, .. } if model == "llama3-70b-8192"
        ));

        assert!(matches!(
            OpenAiCompatibleDriver::classify_failure(StatusCode::TOO_MANY_REQUESTS, "slow down", "m"),
            LlmError::Unavailable(_)
        ));
        assert!(matches!(
            OpenAiCompatibleDriver::classify_failure(StatusCode::BAD_GATEWAY, "", "m"),
            LlmError::Unavailable(_)
        ));

        let unauthorized = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        match OpenAiCompatibleDriver::classify_failure(StatusCode::UNAUTHORIZED, unauthorized, "m") {
            LlmError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API Key");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
