use hearth_agents::{LlmProvider, LlmRequest, OpenAiProvider, ToolDefinition};
use hearth_common::{Error, Message, Role, ToolCall};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer) -> OpenAiProvider {
    OpenAiProvider::new(
        "test-key",
        Some(server.uri()),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn completion_returns_the_assistant_text() {
    let mock_server = MockServer::start().await;

    let response_body = json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1677652288,
        "model": "gpt-4o-2024-08-06",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "Hello there!",
            },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 9,
            "completion_tokens": 12,
            "total_tokens": 21
        }
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
        .mount(&mock_server)
        .await;

    let provider = provider_for(&mock_server);
    let request = LlmRequest::new("gpt-4o", vec![Message::user("Hello")]);

    let response = provider.complete(&request).await.unwrap();

    assert_eq!(response.message.role, Role::Assistant);
    assert_eq!(response.message.content, "Hello there!");
    assert!(response.message.tool_calls.is_empty());
    assert_eq!(response.model, "gpt-4o-2024-08-06");
    let usage = response.usage.unwrap();
    assert_eq!(usage.input_tokens, 9);
    assert_eq!(usage.output_tokens, 12);
}

#[tokio::test]
async fn tool_calls_are_parsed_with_json_arguments() {
    let mock_server = MockServer::start().await;

    let response_body = json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1677652288,
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_abc123",
                    "type": "function",
                    "function": {
                        "name": "control_entities",
                        "arguments": "{\"command\": \"turn_on\", \"entities\": [\"light.kitchen\"]}"
                    }
                }]
            },
            "finish_reason": "tool_calls"
        }]
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
        .mount(&mock_server)
        .await;

    let provider = provider_for(&mock_server);
    let request = LlmRequest::new("gpt-4o", vec![Message::user("Turn on the kitchen light")]);

    let response = provider.complete(&request).await.unwrap();

    assert_eq!(response.message.tool_calls.len(), 1);
    let call = &response.message.tool_calls[0];
    assert_eq!(call.id, "call_abc123");
    assert_eq!(call.name, "control_entities");
    assert_eq!(call.arguments["command"], "turn_on");
    assert_eq!(call.arguments["entities"][0], "light.kitchen");
}

#[tokio::test]
async fn unparseable_arguments_are_kept_verbatim() {
    let mock_server = MockServer::start().await;

    let response_body = json!({
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {
                        "name": "lookup",
                        "arguments": "not json {"
                    }
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "model": "gpt-4o"
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
        .mount(&mock_server)
        .await;

    let provider = provider_for(&mock_server);
    let request = LlmRequest::new("gpt-4o", vec![Message::user("hi")]);

    let response = provider.complete(&request).await.unwrap();

    assert_eq!(
        response.message.tool_calls[0].arguments,
        json!("not json {")
    );
}

#[tokio::test]
async fn request_carries_transcript_and_tools_on_the_wire() {
    let mock_server = MockServer::start().await;

    let expected_body = json!({
        "model": "gpt-4o",
        "messages": [
            {"role": "system", "content": "Be brief."},
            {"role": "user", "content": "Turn it on"},
            {"role": "assistant", "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "control_entities", "arguments": "{\"command\":\"turn_on\"}"}
            }]},
            {"role": "tool", "tool_call_id": "call_1", "content": "Ok"}
        ],
        "temperature": 0.0,
        "tools": [{"type": "function", "function": {"name": "control_entities"}}]
    });

    let response_body = json!({
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Done."},
            "finish_reason": "stop"
        }],
        "model": "gpt-4o"
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(expected_body))
        .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
        .mount(&mock_server)
        .await;

    let provider = provider_for(&mock_server);
    let request = LlmRequest {
        model: "gpt-4o".to_string(),
        messages: vec![
            Message::system("Be brief."),
            Message::user("Turn it on"),
            Message::assistant_with_tools(
                "",
                vec![ToolCall::new(
                    "call_1",
                    "control_entities",
                    json!({"command": "turn_on"}),
                )],
            ),
            Message::tool("call_1", "Ok"),
        ],
        max_tokens: None,
        temperature: Some(0.0),
        tools: vec![ToolDefinition {
            name: "control_entities".to_string(),
            description: "Control entities".to_string(),
            parameters: json!({"type": "object"}),
        }],
    };

    // An unmatched body would 404 and fail the call.
    let response = provider.complete(&request).await.unwrap();
    assert_eq!(response.message.content, "Done.");
}

#[tokio::test]
async fn error_status_becomes_model_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&mock_server)
        .await;

    let provider = provider_for(&mock_server);
    let request = LlmRequest::new("gpt-4o", vec![Message::user("hi")]);

    let err = provider.complete(&request).await.unwrap_err();
    match err {
        Error::ModelUnavailable(reason) => {
            assert!(reason.contains("500"), "reason was: {reason}");
            assert!(reason.contains("overloaded"), "reason was: {reason}");
        }
        other => panic!("expected ModelUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_choices_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"choices": [], "model": "gpt-4o"})),
        )
        .mount(&mock_server)
        .await;

    let provider = provider_for(&mock_server);
    let request = LlmRequest::new("gpt-4o", vec![Message::user("hi")]);

    let err = provider.complete(&request).await.unwrap_err();
    assert!(matches!(err, Error::ModelUnavailable(_)));
}

#[tokio::test]
async fn health_check_reflects_endpoint_status() {
    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&healthy)
        .await;
    assert!(provider_for(&healthy).health_check().await.unwrap());

    let unhealthy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&unhealthy)
        .await;
    assert!(!provider_for(&unhealthy).health_check().await.unwrap());
}

#[tokio::test]
async fn groq_base_url_sets_the_provider_id() {
    let provider = OpenAiProvider::new(
        "test-key",
        Some("https://api.groq.com/openai/v1".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();
    assert_eq!(provider.provider_id(), "groq");

    let provider = OpenAiProvider::new("test-key", None, Duration::from_secs(5)).unwrap();
    assert_eq!(provider.provider_id(), "openai");
}
