use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use tracing::warn;

use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall, ToolChoice};

lazy_static! {
    static ref INVALID_NAME_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]").expect("valid regex");
}

/// Convert internal Message format to OpenAI's API message specification
///
/// A tool message expands into one openai `tool` message per result.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        match message.role {
            Role::Tool => {
                for result in &message.tool_results {
                    messages_spec.push(json!({
                        "role": "tool",
                        "content": result.content,
                        "tool_call_id": result.tool_call_id,
                    }));
                }
            }
            Role::User | Role::Assistant => {
                let mut converted = json!({
                    "role": message.role.to_string(),
                    "content": message.content,
                });

                if !message.tool_calls.is_empty() {
                    let tool_calls: Vec<Value> = message
                        .tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": sanitize_function_name(&call.name),
                                    "arguments": arguments_to_string(&call.arguments),
                                }
                            })
                        })
                        .collect();
                    converted["tool_calls"] = json!(tool_calls);
                    if message.content.is_empty() {
                        converted["content"] = Value::Null;
                    }
                }

                messages_spec.push(converted);
            }
        }
    }

    messages_spec
}

// Unparseable arguments are kept as the raw string the provider sent.
fn arguments_to_string(arguments: &Value) -> String {
    match arguments {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

/// The openai `tool_choice` value, or None to leave the provider default
pub fn tool_choice_to_openai_spec(tool_choice: &ToolChoice) -> Option<Value> {
    match tool_choice {
        ToolChoice::Auto => None,
        ToolChoice::Required => Some(json!("required")),
        ToolChoice::Tool(name) => Some(json!({
            "type": "function",
            "function": {"name": name}
        })),
    }
}

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: &Value) -> Result<Message> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("No message in OpenAI response"))?;

    let mut message = Message::assistant();

    if let Some(text) = original.get("content").and_then(|text| text.as_str()) {
        message = message.with_text(text);
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(|calls| calls.as_array()) {
        for (index, tool_call) in tool_calls.iter().enumerate() {
            let id = tool_call["id"]
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| format!("call_{}", index));
            let function_name = tool_call["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let raw_arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default();

            message.tool_calls.push(ToolCall::new(
                id,
                function_name,
                parse_arguments(raw_arguments),
            ));
        }
    }

    Ok(message)
}

/// Parse tool arguments sent as a JSON string.
///
/// An empty string means no arguments. Anything that does not parse is kept
/// verbatim as a string value so the consumer can reject it.
pub fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(params) => params,
        Err(e) => {
            warn!(error = %e, "could not interpret tool call arguments");
            Value::String(raw.to_string())
        }
    }
}

/// Extract the text delta from one server-sent event line of an openai stream.
///
/// Returns Ok(None) for keep-alives, the terminal `[DONE]` marker, and deltas
/// without text.
pub fn openai_stream_delta(line: &str) -> Result<Option<String>> {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let event: Value = serde_json::from_str(data)?;
    if let Some(error) = event.get("error") {
        return Err(anyhow!("OpenAI API error: {}", error));
    }
    Ok(event["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|text| !text.is_empty())
        .map(String::from))
}

pub fn sanitize_function_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const OPENAI_TOOL_USE_RESPONSE: &str = r#"{
        "choices": [{
            "role": "assistant",
            "message": {
                "tool_calls": [{
                    "id": "1",
                    "function": {
                        "name": "example_fn",
                        "arguments": "{\"param\": \"value\"}"
                    }
                }]
            }
        }],
        "usage": {
            "input_tokens": 10,
            "output_tokens": 25,
            "total_tokens": 35
        }
    }"#;

    #[test]
    fn test_messages_to_openai_spec() {
        let messages = vec![
            Message::user().with_text("Hello"),
            Message::assistant().with_tool_call("c1", "list_notes", json!({})),
            Message::tool()
                .with_tool_result("c1", "[]")
                .with_tool_result("c1", "again"),
        ];
        let spec = messages_to_openai_spec(&messages);

        assert_eq!(spec.len(), 4);
        assert_eq!(spec[0]["role"], "user");
        assert_eq!(spec[0]["content"], "Hello");
        assert_eq!(spec[1]["content"], Value::Null);
        assert_eq!(spec[1]["tool_calls"][0]["function"]["name"], "list_notes");
        assert_eq!(spec[1]["tool_calls"][0]["function"]["arguments"], "{}");
        assert_eq!(spec[2]["role"], "tool");
        assert_eq!(spec[2]["tool_call_id"], "c1");
        assert_eq!(spec[3]["content"], "again");
    }

    #[test]
    fn test_tools_to_openai_spec_rejects_duplicates() {
        let tool = Tool::new("test_tool", "A test tool", json!({"type": "object"}));
        let spec = tools_to_openai_spec(&[tool.clone()]).unwrap();
        assert_eq!(spec[0]["function"]["name"], "test_tool");
        assert_eq!(spec[0]["function"]["parameters"]["type"], "object");

        assert!(tools_to_openai_spec(&[tool.clone(), tool]).is_err());
    }

    #[test]
    fn test_tool_choice_to_openai_spec() {
        assert_eq!(tool_choice_to_openai_spec(&ToolChoice::Auto), None);
        assert_eq!(
            tool_choice_to_openai_spec(&ToolChoice::Required),
            Some(json!("required"))
        );
        assert_eq!(
            tool_choice_to_openai_spec(&ToolChoice::Tool("rank_notes".into())),
            Some(json!({"type": "function", "function": {"name": "rank_notes"}}))
        );
    }

    #[test]
    fn test_openai_response_to_message_tool_call() -> Result<()> {
        let response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;
        let message = openai_response_to_message(&response)?;

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].id, "1");
        assert_eq!(message.tool_calls[0].name, "example_fn");
        assert_eq!(message.tool_calls[0].arguments, json!({"param": "value"}));
        Ok(())
    }

    #[test]
    fn test_openai_response_keeps_bad_arguments_raw() -> Result<()> {
        let mut response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;
        response["choices"][0]["message"]["tool_calls"][0]["function"]["arguments"] =
            json!("{\"invalid\": json}");

        let message = openai_response_to_message(&response)?;
        assert_eq!(
            message.tool_calls[0].arguments,
            Value::String("{\"invalid\": json}".into())
        );
        Ok(())
    }

    #[test]
    fn test_openai_stream_delta() -> Result<()> {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(openai_stream_delta(line)?, Some("Hel".to_string()));
        assert_eq!(openai_stream_delta("data: [DONE]")?, None);
        assert_eq!(openai_stream_delta(": keep-alive")?, None);
        assert_eq!(
            openai_stream_delta(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#)?,
            None
        );
        assert!(openai_stream_delta(r#"data: {"error":{"message":"boom"}}"#).is_err());
        Ok(())
    }

    #[test]
    fn test_sanitize_function_name() {
        assert_eq!(sanitize_function_name("hello-world"), "hello-world");
        assert_eq!(sanitize_function_name("hello world"), "hello_world");
        assert_eq!(sanitize_function_name("hello@world"), "hello_world");
    }

    #[test]
    fn test_check_openai_context_length_error() {
        let error = json!({
            "code": "context_length_exceeded",
            "message": "This message is too long"
        });

        let result = check_openai_context_length_error(&error);
        assert!(result.is_some());
        assert_eq!(
            result.unwrap().to_string(),
            "Context length exceeded. Message: This message is too long"
        );

        let error = json!({
            "code": "other_error",
            "message": "Some other error"
        });
        assert!(check_openai_context_length_error(&error).is_none());
    }
}
