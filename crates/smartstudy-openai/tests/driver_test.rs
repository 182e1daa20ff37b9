// Integration tests for the OpenAI-compatible driver against a mock server

use serde_json::json;
use smartstudy_core::llm::{LlmCallConfig, LlmMessage};
use smartstudy_openai::{LlmDriver, LlmError, OpenAiCompatibleDriver};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> LlmCallConfig {
    LlmCallConfig::new("llama-3.3-70b-versatile")
        .with_temperature(0.0)
        .json_object()
}

fn driver(server: &MockServer) -> OpenAiCompatibleDriver {
    OpenAiCompatibleDriver::with_base_url("test-key", format!("{}/v1/chat/completions", server.uri()))
}

#[tokio::test]
async fn test_completion_text_and_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "llama-3.3-70b-versatile",
            "temperature": 0.0,
            "response_format": { "type": "json_object" },
            "stream": false,
            "messages": [
                { "role": "system", "content": "rules" },
                { "role": "user", "content": "hello" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "model": "llama-3.3-70b-versatile",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "{\"intent\":\"help\"}" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 120, "completion_tokens": 6, "total_tokens": 126 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = driver(&server)
        .chat_completion(
            vec![LlmMessage::system("rules"), LlmMessage::user("hello")],
            &config(),
        )
        .await
        .unwrap();

    assert_eq!(response.text, r#"{"intent":"help"}"#);
    assert_eq!(response.metadata.total_tokens, Some(126));
    assert_eq!(response.metadata.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn test_null_content_is_empty_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        })))
        .mount(&server)
        .await;

    let response = driver(&server)
        .chat_completion(vec![LlmMessage::user("hi")], &config())
        .await
        .unwrap();

    assert_eq!(response.text, "");
}

#[tokio::test]
async fn test_decommissioned_model_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "The model `llama3-70b-8192` has been decommissioned and is no longer supported.",
                "type": "invalid_request_error",
                "code": "model_decommissioned"
            }
        })))
        .mount(&server)
        .await;

    let err = driver(&server)
        .chat_completion(
            vec![LlmMessage::user("hi")],
            &LlmCallConfig::new("llama3-70b-8192"),
        )
        .await
        .unwrap_err();

    match err {
        LlmError::ModelRejected { model, message } => {
            assert_eq!(model, "llama3-70b-8192");
            assert!(message.contains("decommissioned"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_errors_mean_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
        .mount(&server)
        .await;

    let err = driver(&server)
        .chat_completion(vec![LlmMessage::user("hi")], &config())
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::Unavailable(_)));
}

#[tokio::test]
async fn test_timeout_means_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "choices": [] }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let err = driver(&server)
        .with_timeout(Duration::from_millis(50))
        .unwrap()
        .chat_completion(vec![LlmMessage::user("hi")], &config())
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::Unavailable(_)));
}

#[tokio::test]
async fn test_connection_refused_means_unavailable() {
    let driver = OpenAiCompatibleDriver::with_base_url("k", "http://127.0.0.1:9/v1/chat/completions");

    let err = driver
        .chat_completion(vec![LlmMessage::user("hi")], &config())
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::Unavailable(_)));
}

#[tokio::test]
async fn test_empty_choices_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = driver(&server)
        .chat_completion(vec![LlmMessage::user("hi")], &config())
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::Protocol(_)));
}
