//! OpenAI-compatible client against a mock HTTP server.

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tether::error::TetherError;
use tether::llm::{AskRequest, ModelClient, OpenAiCompatibleClient, ToolDefinition};
use tether::types::Message;
use tether::util::retry::RetryPolicy;

fn client(server: &MockServer) -> OpenAiCompatibleClient {
    OpenAiCompatibleClient::new(server.uri(), Some("sk-test".into()), "test-model")
        .unwrap()
        .with_retry(RetryPolicy::none())
}

#[tokio::test]
async fn ask_returns_the_assistant_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "test-model", "temperature": 0.0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "research"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let answer = client(&server)
        .ask(AskRequest::new(vec![Message::user("pick a skill")]).with_temperature(0.0))
        .await
        .unwrap();

    assert_eq!(answer.as_deref(), Some("research"));
}

#[tokio::test]
async fn ask_tool_parses_tool_calls_and_sends_definitions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "override-model",
            "tool_choice": "auto",
            "tools": [{"type": "function", "function": {"name": "ask_human"}}],
            "messages": [{"role": "system", "content": "be brief"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "ask_human", "arguments": "{\"question\":\"Which city?\"}"}
                }]
            }}]
        })))
        .mount(&server)
        .await;

    let tools = [ToolDefinition {
        name: "ask_human".into(),
        description: "Ask the human".into(),
        parameters: json!({"type": "object", "properties": {}}),
    }];
    let turn = client(&server)
        .ask_tool(
            AskRequest::new(vec![Message::user("book a trip")])
                .with_system("be brief")
                .with_model(Some("override-model".into())),
            &tools,
        )
        .await
        .unwrap();

    assert!(turn.content.is_none());
    assert_eq!(turn.tool_calls.len(), 1);
    assert_eq!(turn.tool_calls[0].id, "call_1");
    assert_eq!(turn.tool_calls[0].arguments["question"], "Which city?");
}

#[tokio::test]
async fn http_errors_map_to_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let err = client(&server)
        .ask(AskRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    match err {
        TetherError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid key");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
