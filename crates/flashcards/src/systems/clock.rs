use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use super::system::System;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};

pub struct ClockSystem {
    tools: Vec<Tool>,
}

impl Default for ClockSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSystem {
    pub fn new() -> Self {
        Self {
            tools: vec![Tool::new(
                "get_current_time",
                "Gets the current timestamp in ISO format",
                json!({"type": "object", "properties": {}}),
            )],
        }
    }
}

#[async_trait]
impl System for ClockSystem {
    fn name(&self) -> &str {
        "ClockSystem"
    }

    fn description(&self) -> &str {
        "Current date and time"
    }

    fn instructions(&self) -> &str {
        "Call get_current_time before reasoning about dates, for example when listing recent knowledge checks."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: &ToolCall) -> AgentResult<String> {
        match tool_call.name.as_str() {
            "get_current_time" => Ok(Utc::now().to_rfc3339()),
            _ => Err(AgentError::ToolNotFound(tool_call.name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn test_current_time_is_rfc3339() {
        let out = ClockSystem::new()
            .call(&ToolCall::new("1", "get_current_time", json!({})))
            .await
            .unwrap();
        assert!(DateTime::parse_from_rfc3339(&out).is_ok());
    }
}
