use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};

/// Core trait that defines a system that can be operated by an AI agent
#[async_trait]
pub trait System: Send + Sync {
    /// Get the name of the system
    fn name(&self) -> &str;

    /// Get the system description
    fn description(&self) -> &str;

    /// Get system instructions, rendered into the agent's system prompt
    fn instructions(&self) -> &str;

    /// Get available tools
    fn tools(&self) -> &[Tool];

    /// Call a tool with the given parameters, producing the text shown to the model
    async fn call(&self, tool_call: &ToolCall) -> AgentResult<String>;
}

/// Decode the arguments of a tool call into its typed input.
///
/// Missing or null arguments decode as an empty object.
pub fn parse_arguments<T: DeserializeOwned>(tool_call: &ToolCall) -> AgentResult<T> {
    let arguments = match &tool_call.arguments {
        Value::Null => Value::Object(Map::new()),
        Value::Object(_) => tool_call.arguments.clone(),
        other => {
            return Err(AgentError::InvalidParameters(format!(
                "arguments for {} must be a JSON object, got {}",
                tool_call.name, other
            )))
        }
    };

    serde_json::from_value(arguments).map_err(|e| {
        AgentError::InvalidParameters(format!("failed to parse {} input: {}", tool_call.name, e))
    })
}

/// Serialize a tool output as compact JSON
pub fn to_json<T: serde::Serialize>(value: &T) -> AgentResult<String> {
    serde_json::to_string(value).map_err(|e| AgentError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Input {
        note_id: i64,
        #[serde(default)]
        line_number_start: Option<u32>,
    }

    #[test]
    fn test_parse_arguments() {
        let call = ToolCall::new("1", "read_note", json!({"note_id": 4}));
        let input: Input = parse_arguments(&call).unwrap();
        assert_eq!(input.note_id, 4);
        assert_eq!(input.line_number_start, None);

        let raw = ToolCall::new("2", "read_note", Value::String("{broken".into()));
        assert!(matches!(
            parse_arguments::<Input>(&raw),
            Err(AgentError::InvalidParameters(_))
        ));

        let missing = ToolCall::new("3", "read_note", Value::Null);
        assert!(parse_arguments::<Input>(&missing).is_err());
    }
}
