use super::role::Role;
use super::tool::{ToolCall, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A message to or from an LLM
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,
}

impl Message {
    fn new(role: Role) -> Self {
        Message {
            role,
            content: String::new(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    /// Create a new user message
    pub fn user() -> Self {
        Self::new(Role::User)
    }

    /// Create a new assistant message
    pub fn assistant() -> Self {
        Self::new(Role::Assistant)
    }

    /// Create a new tool message, which carries results for earlier tool calls
    pub fn tool() -> Self {
        Self::new(Role::Tool)
    }

    /// Append text to the message content
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        let text = text.into();
        if self.content.is_empty() {
            self.content = text;
        } else {
            self.content.push('\n');
            self.content.push_str(&text);
        }
        self
    }

    /// Add a tool call to the message
    pub fn with_tool_call<I, S>(mut self, id: I, name: S, arguments: Value) -> Self
    where
        I: Into<String>,
        S: Into<String>,
    {
        self.tool_calls.push(ToolCall::new(id, name, arguments));
        self
    }

    /// Add a tool result to the message
    pub fn with_tool_result<I, S>(mut self, tool_call_id: I, content: S) -> Self
    where
        I: Into<String>,
        S: Into<String>,
    {
        self.tool_results.push(ToolResult::new(tool_call_id, content));
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// The text content, or None when the message has no text
    pub fn text(&self) -> Option<&str> {
        if self.content.trim().is_empty() {
            None
        } else {
            Some(&self.content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builders_accumulate() {
        let message = Message::assistant()
            .with_text("Let me look")
            .with_tool_call("1", "list_notes", json!({}))
            .with_tool_call("2", "read_note", json!({"note_id": "n1"}));

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "Let me look");
        assert_eq!(message.tool_calls.len(), 2);
        assert_eq!(message.tool_calls[1].name, "read_note");
        assert!(message.has_tool_calls());
    }

    #[test]
    fn test_empty_lists_are_omitted_when_serialized() {
        let value = serde_json::to_value(Message::user().with_text("hi")).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hi"}));

        let decoded: Message =
            serde_json::from_value(json!({"role": "assistant", "content": ""})).unwrap();
        assert!(decoded.tool_calls.is_empty());
        assert!(decoded.text().is_none());
    }
}
