use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::system::System;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};

/// The fixed set of tools available to a conversation, and the systems
/// that execute them. Read-only once built.
pub struct ToolRegistry {
    systems: Vec<Box<dyn System>>,
    owners: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Build a registry, rejecting tool names advertised by more than one system.
    pub fn new(systems: Vec<Box<dyn System>>) -> AgentResult<Self> {
        let mut owners = HashMap::new();
        for (index, system) in systems.iter().enumerate() {
            for tool in system.tools() {
                if let Some(previous) = owners.insert(tool.name.clone(), index) {
                    return Err(AgentError::Internal(format!(
                        "Duplicate tool name '{}' in systems {} and {}",
                        tool.name,
                        systems[previous].name(),
                        system.name()
                    )));
                }
            }
        }
        Ok(Self { systems, owners })
    }

    pub fn empty() -> Self {
        Self {
            systems: Vec::new(),
            owners: HashMap::new(),
        }
    }

    pub fn systems(&self) -> &[Box<dyn System>] {
        &self.systems
    }

    /// Every tool spec, in system registration order
    pub fn list_specs(&self) -> Vec<Tool> {
        self.systems
            .iter()
            .flat_map(|system| system.tools().iter().cloned())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.owners.contains_key(name)
    }

    pub async fn dispatch(&self, name: &str, arguments: Value) -> AgentResult<String> {
        self.dispatch_call(&ToolCall::new("", name, arguments)).await
    }

    /// Execute a tool call with the system that owns the tool
    pub async fn dispatch_call(&self, call: &ToolCall) -> AgentResult<String> {
        let system = self
            .owners
            .get(&call.name)
            .and_then(|index| self.systems.get(*index))
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        debug!(tool = %call.name, system = system.name(), "dispatching tool call");
        system.call(call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoSystem {
        name: String,
        tools: Vec<Tool>,
    }

    impl EchoSystem {
        fn new(name: &str, tool: &str) -> Self {
            Self {
                name: name.to_string(),
                tools: vec![Tool::new(
                    tool,
                    "Echoes back the input",
                    json!({"type": "object", "properties": {"message": {"type": "string"}}}),
                )],
            }
        }
    }

    #[async_trait]
    impl System for EchoSystem {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "Echo"
        }

        fn instructions(&self) -> &str {
            ""
        }

        fn tools(&self) -> &[Tool] {
            &self.tools
        }

        async fn call(&self, tool_call: &ToolCall) -> AgentResult<String> {
            Ok(format!(
                "{}:{}",
                self.name,
                tool_call.arguments["message"].as_str().unwrap_or("")
            ))
        }
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_owner() {
        let registry = ToolRegistry::new(vec![
            Box::new(EchoSystem::new("a", "echo_a")),
            Box::new(EchoSystem::new("b", "echo_b")),
        ])
        .unwrap();

        let names: Vec<String> = registry.list_specs().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["echo_a", "echo_b"]);

        let out = registry
            .dispatch("echo_b", json!({"message": "hi"}))
            .await
            .unwrap();
        assert_eq!(out, "b:hi");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let registry = ToolRegistry::new(vec![Box::new(EchoSystem::new("a", "echo"))]).unwrap();
        let err = registry.dispatch("missing", json!({})).await.unwrap_err();
        assert_eq!(err, AgentError::ToolNotFound("missing".into()));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let result = ToolRegistry::new(vec![
            Box::new(EchoSystem::new("a", "echo")),
            Box::new(EchoSystem::new("b", "echo")),
        ]);
        assert!(matches!(result, Err(AgentError::Internal(_))));
    }
}
