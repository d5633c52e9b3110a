use super::*;
use crate::prompts::ChatPrompt;
use serde_json::Value;

fn prompt() -> ChatPrompt {
    ChatPrompt {
        system: "You are an expert editor.".to_owned(),
        user: "Improve this.".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// build_request_body
// ---------------------------------------------------------------------------

#[test]
fn test_build_request_body() {
    let prompt = prompt();
    let call = ChatCall {
        model: "gpt-4o-mini",
        prompt: &prompt,
        temperature: 0.7,
        max_tokens: 8192,
    };

    let body = OpenAiChatWire.build_request_body(&call).unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["model"], "gpt-4o-mini");
    assert_eq!(json["stream"], false);
    assert_eq!(json["temperature"], 0.7);
    assert_eq!(json["max_tokens"], 8192);
    assert_eq!(json["messages"].as_array().unwrap().len(), 2);
    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][0]["content"], "You are an expert editor.");
    assert_eq!(json["messages"][1]["role"], "user");
    assert_eq!(json["messages"][1]["content"], "Improve this.");
}

// ---------------------------------------------------------------------------
// parse_response
// ---------------------------------------------------------------------------

#[test]
fn test_parse_response_takes_first_choice() {
    let body = serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-4o-mini",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": "first"}, "finish_reason": "stop"},
            {"index": 1, "message": {"role": "assistant", "content": "second"}, "finish_reason": "stop"}
        ],
        "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
    });

    let reply = OpenAiChatWire
        .parse_response(body.to_string().as_bytes())
        .unwrap();

    assert_eq!(reply.model, "gpt-4o-mini");
    assert_eq!(reply.text, "first");
}

#[test]
fn test_parse_response_null_content_is_empty() {
    let body = r#"{"model": "m", "choices": [{"message": {"role": "assistant", "content": null}}]}"#;

    let reply = OpenAiChatWire.parse_response(body.as_bytes()).unwrap();
    assert_eq!(reply.text, "");
}

#[test]
fn test_parse_response_without_choices_is_malformed() {
    let body = r#"{"model": "m", "choices": []}"#;

    let err = OpenAiChatWire.parse_response(body.as_bytes()).unwrap_err();
    assert!(matches!(err, GenerationError::Malformed(_)));
}

#[test]
fn test_parse_response_invalid_json() {
    let err = OpenAiChatWire.parse_response(b"<html>").unwrap_err();
    assert!(matches!(err, GenerationError::Malformed(_)));
}

// ---------------------------------------------------------------------------
// extra_headers
// ---------------------------------------------------------------------------

#[test]
fn test_extra_headers_with_api_key() {
    let headers = OpenAiChatWire.extra_headers(Some("sk-test"));

    assert!(headers.contains(&("Content-Type".to_owned(), "application/json".to_owned())));
    assert!(headers.contains(&("Authorization".to_owned(), "Bearer sk-test".to_owned())));
}

#[test]
fn test_extra_headers_without_api_key() {
    let headers = OpenAiChatWire.extra_headers(None);
    assert!(headers.iter().all(|(k, _)| k != "Authorization"));
}
