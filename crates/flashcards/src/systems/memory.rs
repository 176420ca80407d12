use async_trait::async_trait;
use indoc::indoc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::system::{parse_arguments, System};
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};
use crate::store::MemoryStore;

#[derive(Debug, Deserialize)]
struct UpdateMemoryInput {
    content: String,
}

/// A single free-form memory the assistant keeps about the user
pub struct MemorySystem {
    tools: Vec<Tool>,
    memory: Arc<dyn MemoryStore>,
}

impl MemorySystem {
    pub fn new(memory: Arc<dyn MemoryStore>) -> Self {
        let tools = vec![
            Tool::new(
                "get_memory",
                "Retrieves the agent's current memory content",
                json!({"type": "object", "properties": {}}),
            ),
            Tool::new(
                "update_memory",
                "Updates the agent's memory with new content",
                json!({
                    "type": "object",
                    "required": ["content"],
                    "properties": {
                        "content": {"type": "string", "description": "The new memory content to store"}
                    }
                }),
            ),
        ];
        Self { tools, memory }
    }
}

#[async_trait]
impl System for MemorySystem {
    fn name(&self) -> &str {
        "MemorySystem"
    }

    fn description(&self) -> &str {
        "Persistent memory about the user across conversations"
    }

    fn instructions(&self) -> &str {
        indoc! {r#"
            The memory is a single text document. update_memory replaces it entirely,
            so read it with get_memory first and write back the full revised text.
        "#}
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: &ToolCall) -> AgentResult<String> {
        match tool_call.name.as_str() {
            "get_memory" => {
                let memory = self.memory.get().await?;
                if memory.content.is_empty() {
                    Ok("(empty)".to_string())
                } else {
                    Ok(memory.content)
                }
            }
            "update_memory" => {
                let input: UpdateMemoryInput = parse_arguments(tool_call)?;
                self.memory.update(&input.content).await?;
                Ok("Memory updated successfully".to_string())
            }
            _ => Err(AgentError::ToolNotFound(tool_call.name.clone())),
        }
    }
}
