// Completion requester
//
// Sends instructions + context + user message to the model and turns the
// reply into a JSON value. A reply that does not parse gets exactly one
// repair request quoting it; a second failure is reported with both texts.
// Upstream errors are never retried here.

use serde_json::Value;
use std::sync::Arc;

use crate::config::AssistantConfig;
use crate::error::{AssistantError, Result};
use crate::llm::LlmMessage;
use crate::prompt::{repair_request, repair_system_prompt, SYSTEM_PROMPT};
use crate::traits::LlmDriver;

/// Remove a surrounding Markdown code fence (```json ... ```), if any
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    trimmed
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

fn parse_reply(text: &str) -> std::result::Result<Value, serde_json::Error> {
    let body = strip_code_fences(text);
    // a reply without content counts as an empty object
    if body.is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(body)
}

/// Requests one intent candidate from the language model
#[derive(Clone)]
pub struct CompletionRequester {
    driver: Arc<dyn LlmDriver>,
    config: AssistantConfig,
}

impl CompletionRequester {
    pub fn new(driver: Arc<dyn LlmDriver>, config: AssistantConfig) -> Self {
        Self { driver, config }
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Ask for an intent; returns the parsed (not yet validated) JSON value
    pub async fn request_intent(&self, context: &str, message: &str) -> Result<Value> {
        let call_config = self.config.call_config();
        let messages = vec![
            LlmMessage::system(SYSTEM_PROMPT),
            LlmMessage::system(context),
            LlmMessage::user(message),
        ];

        let response = self.driver.chat_completion(messages, &call_config).await?;
        tracing::debug!(
            model = %call_config.model,
            total_tokens = ?response.metadata.total_tokens,
            "Received intent completion"
        );

        let raw = response.text;
        let parse_error = match parse_reply(&raw) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        tracing::warn!(error = %parse_error, "Model reply is not valid JSON, retrying with repair prompt");

        let repair_messages = vec![
            LlmMessage::system(repair_system_prompt()),
            LlmMessage::system(context),
            LlmMessage::user(message),
            LlmMessage::user(repair_request(&raw)),
        ];
        let repair = self
            .driver
            .chat_completion(repair_messages, &call_config)
            .await?
            .text;

        parse_reply(&repair).map_err(|e| {
            tracing::warn!(error = %e, "Repair reply is not valid JSON either");
            AssistantError::ResponseMalformed { raw, repair }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{LlmMessageRole, ResponseFormat};
    use crate::memory::MockLlmDriver;
    use serde_json::json;

    fn requester(driver: &MockLlmDriver) -> CompletionRequester {
        CompletionRequester::new(Arc::new(driver.clone()), AssistantConfig::default())
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_valid_reply_uses_one_call() {
        let driver = MockLlmDriver::new(vec![r#"{"intent":"help","payload":{}}"#]);

        let value = requester(&driver)
            .request_intent("CONTEXT", "hello")
            .await
            .unwrap();

        assert_eq!(value, json!({"intent": "help", "payload": {}}));
        let calls = driver.calls().await;
        assert_eq!(calls.len(), 1);

        let (messages, config) = &calls[0];
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                LlmMessageRole::System,
                LlmMessageRole::System,
                LlmMessageRole::User
            ]
        );
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].content, "CONTEXT");
        assert_eq!(messages[2].content, "hello");
        assert_eq!(config.temperature, Some(0.0));
        assert_eq!(config.response_format, ResponseFormat::JsonObject);
        assert_eq!(config.model, "llama-3.3-70b-versatile");
    }

    #[tokio::test]
    async fn test_fenced_reply_parses_without_repair() {
        let driver = MockLlmDriver::new(vec!["```json\n{\"intent\":\"get_tasks\"}\n```"]);

        let value = requester(&driver).request_intent("C", "tasks?").await.unwrap();

        assert_eq!(value, json!({"intent": "get_tasks"}));
        assert_eq!(driver.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_reply_is_repaired_once() {
        let driver = MockLlmDriver::new(vec![
            r#"{"intent":"add_task","payload":{"title":"Essay"}"#,
            r#"{"intent":"add_task","payload":{"title":"Essay"}}"#,
        ]);

        let value = requester(&driver)
            .request_intent("CONTEXT", "add essay task")
            .await
            .unwrap();

        assert_eq!(value["payload"]["title"], "Essay");
        let calls = driver.calls().await;
        assert_eq!(calls.len(), 2);

        let repair = &calls[1].0;
        assert_eq!(repair.len(), 4);
        assert_eq!(
            repair[0].content,
            format!("{}\nReturn strictly valid JSON.", SYSTEM_PROMPT)
        );
        assert_eq!(repair[1].content, "CONTEXT");
        assert_eq!(repair[2].content, "add essay task");
        assert!(repair[3]
            .content
            .ends_with(r#"Here is the invalid JSON: {"intent":"add_task","payload":{"title":"Essay"}"#));
        assert_eq!(calls[1].1.temperature, Some(0.0));
    }

    #[tokio::test]
    async fn test_second_failure_reports_both_texts() {
        let driver = MockLlmDriver::new(vec!["not json", "still not json"]);

        let err = requester(&driver)
            .request_intent("C", "hi")
            .await
            .unwrap_err();

        match err {
            AssistantError::ResponseMalformed { raw, repair } => {
                assert_eq!(raw, "not json");
                assert_eq!(repair, "still not json");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(driver.call_count().await, 2);
    }

    #[tokio::test]
    async fn test_upstream_error_is_not_retried() {
        let driver = MockLlmDriver::failing(LlmError::unavailable("connection refused"));

        let err = requester(&driver)
            .request_intent("C", "hi")
            .await
            .unwrap_err();

        assert_eq!(err.code(), "upstream_unavailable");
        assert_eq!(driver.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_empty_reply_is_empty_object() {
        let driver = MockLlmDriver::new(vec![""]);

        let value = requester(&driver).request_intent("C", "hi").await.unwrap();

        assert_eq!(value, json!({}));
    }
}
