use futures::stream::BoxStream;
use futures::TryStreamExt;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::{ServiceError, ServiceResult};
use crate::models::conversation::Conversation;
use crate::models::message::Message;
use crate::models::tool::ToolChoice;
use crate::prompt_template::PromptSet;
use crate::providers::base::Provider;
use crate::systems::ToolRegistry;

/// Provider rounds allowed for a single reply before the loop gives up
pub const DEFAULT_MAX_ROUNDS: usize = 25;

#[derive(Clone, Debug, Serialize)]
struct SystemInfo {
    name: String,
    description: String,
    instructions: String,
}

impl SystemInfo {
    fn new(name: &str, description: &str, instructions: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            instructions: instructions.to_string(),
        }
    }
}

/// The outcome of [`Agent::reply`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentReply {
    /// The incoming messages followed by everything the agent appended
    pub messages: Vec<Message>,
    /// False when the round cap stopped the loop while tool output was still unread
    pub complete: bool,
}

/// Agent integrates a foundational LLM with the systems it needs to pilot
pub struct Agent {
    provider: Arc<dyn Provider>,
    registry: ToolRegistry,
    prompts: Arc<PromptSet>,
    max_rounds: usize,
}

impl Agent {
    pub fn new(provider: Arc<dyn Provider>, registry: ToolRegistry, prompts: Arc<PromptSet>) -> Self {
        Self {
            provider,
            registry,
            prompts,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn get_system_prompt(&self) -> ServiceResult<String> {
        let systems_info: Vec<SystemInfo> = self
            .registry
            .systems()
            .iter()
            .map(|system| SystemInfo::new(system.name(), system.description(), system.instructions()))
            .collect();

        let mut context = HashMap::new();
        context.insert("systems", systems_info);
        Ok(self.prompts.render("agent_system.md", &context)?)
    }

    /// Create a stream that yields each message as it is appended to the conversation:
    /// every assistant response, then one tool message per requested call.
    ///
    /// The stream ends once the provider answers without tool calls, or when the
    /// round cap is reached.
    pub async fn reply_stream(
        &self,
        messages: Vec<Message>,
    ) -> ServiceResult<BoxStream<'_, ServiceResult<Message>>> {
        if messages.is_empty() {
            return Err(ServiceError::Validation("messages are required".to_string()));
        }
        let mut conversation = Conversation::from_messages(messages)?;
        let tools = self.registry.list_specs();
        let system_prompt = self.get_system_prompt()?;

        info!(
            messages = conversation.len(),
            tools = tools.len(),
            "starting agent reply"
        );

        Ok(Box::pin(async_stream::try_stream! {
            let mut rounds = 0;
            loop {
                if rounds == self.max_rounds {
                    warn!(max_rounds = self.max_rounds, "agent reply stopped at the round cap");
                    break;
                }
                rounds += 1;

                let (response, usage) = self
                    .provider
                    .complete(&system_prompt, conversation.messages(), &tools, &ToolChoice::Auto)
                    .await
                    .map_err(ServiceError::Provider)?;
                debug!(round = rounds, ?usage, tool_calls = response.tool_calls.len(), "provider responded");

                conversation.push(response.clone()).map_err(ServiceError::from)?;
                yield response.clone();

                // Make sure the response reaches the consumer before tools start running
                tokio::task::yield_now().await;

                if !response.has_tool_calls() {
                    break;
                }

                for call in &response.tool_calls {
                    let output = match self.registry.dispatch_call(call).await {
                        Ok(output) => output,
                        Err(err) => {
                            warn!(tool = %call.name, error = %err, "tool call failed");
                            format!("Error: {}", err)
                        }
                    };
                    let message = Message::tool().with_tool_result(call.id.clone(), output);
                    conversation.push(message.clone()).map_err(ServiceError::from)?;
                    yield message;
                }
            }
        }))
    }

    /// Run the loop to the end and return the whole conversation
    pub async fn reply(&self, messages: Vec<Message>) -> ServiceResult<AgentReply> {
        let mut conversation = Conversation::from_messages(messages.clone())?;
        let appended: Vec<Message> = self.reply_stream(messages).await?.try_collect().await?;
        for message in appended {
            conversation.push(message)?;
        }

        Ok(AgentReply {
            complete: conversation.is_complete(),
            messages: conversation.messages().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AgentError, AgentResult};
    use crate::models::role::Role;
    use crate::models::tool::{Tool, ToolCall};
    use crate::providers::mock::MockProvider;
    use crate::systems::System;
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use serde_json::json;

    // Mock system for testing
    struct MockSystem {
        tools: Vec<Tool>,
    }

    impl MockSystem {
        fn new() -> Self {
            Self {
                tools: vec![Tool::new(
                    "echo",
                    "Echoes back the input",
                    json!({"type": "object", "properties": {"message": {"type": "string"}}, "required": ["message"]}),
                )],
            }
        }
    }

    #[async_trait]
    impl System for MockSystem {
        fn name(&self) -> &str {
            "MockSystem"
        }

        fn description(&self) -> &str {
            "A mock system for testing"
        }

        fn instructions(&self) -> &str {
            "Mock system instructions"
        }

        fn tools(&self) -> &[Tool] {
            &self.tools
        }

        async fn call(&self, tool_call: &ToolCall) -> AgentResult<String> {
            match tool_call.arguments["message"].as_str() {
                Some(message) => Ok(message.to_string()),
                None => Err(AgentError::InvalidParameters("message is required".into())),
            }
        }
    }

    fn agent(provider: Arc<MockProvider>) -> Agent {
        let registry = ToolRegistry::new(vec![Box::new(MockSystem::new())]).unwrap();
        Agent::new(provider, registry, Arc::new(PromptSet::embedded().unwrap()))
    }

    #[tokio::test]
    async fn test_simple_response() -> anyhow::Result<()> {
        let response = Message::assistant().with_text("Hello!");
        let provider = Arc::new(MockProvider::new(vec![response.clone()]));
        let agent = agent(provider.clone());

        let mut stream = agent.reply_stream(vec![Message::user().with_text("Hi")]).await?;
        let mut messages = Vec::new();
        while let Some(msg) = stream.try_next().await? {
            messages.push(msg);
        }

        assert_eq!(messages, vec![response]);

        let requests = provider.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tool_names, vec!["echo"]);
        assert_eq!(requests[0].tool_choice, ToolChoice::Auto);
        assert!(requests[0].system.contains("MockSystem"));
        assert!(requests[0].system.contains("Mock system instructions"));
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_calls_run_in_order() -> anyhow::Result<()> {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant()
                .with_tool_call("1", "echo", json!({"message": "first"}))
                .with_tool_call("2", "echo", json!({"message": "second"})),
            Message::assistant().with_text("All done!"),
        ]));
        let agent = agent(provider.clone());

        let reply = agent.reply(vec![Message::user().with_text("Multiple calls")]).await?;

        // user, assistant with calls, two tool messages, final text
        assert_eq!(reply.messages.len(), 5);
        assert!(reply.complete);
        assert_eq!(reply.messages[2].role, Role::Tool);
        assert_eq!(reply.messages[2].tool_results[0].tool_call_id, "1");
        assert_eq!(reply.messages[2].tool_results[0].content, "first");
        assert_eq!(reply.messages[3].tool_results[0].tool_call_id, "2");
        assert_eq!(reply.messages[3].tool_results[0].content, "second");
        assert_eq!(reply.messages[4].content, "All done!");

        // the second round sees the tool output
        let requests = provider.requests().await;
        assert_eq!(requests[1].messages.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_errors_become_content() -> anyhow::Result<()> {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant()
                .with_tool_call("1", "invalid_tool", json!({}))
                .with_tool_call("2", "echo", json!({})),
            Message::assistant().with_text("Error occurred"),
        ]));
        let reply = agent(provider).reply(vec![Message::user().with_text("go")]).await?;

        assert_eq!(
            reply.messages[2].tool_results[0].content,
            "Error: Tool not found: invalid_tool"
        );
        assert_eq!(
            reply.messages[3].tool_results[0].content,
            "Error: Invalid parameters: message is required"
        );
        assert_eq!(reply.messages[4].content, "Error occurred");
        Ok(())
    }

    #[tokio::test]
    async fn test_provider_failure_aborts() {
        let provider = Arc::new(MockProvider::scripted(vec![
            Ok(Message::assistant().with_tool_call("1", "echo", json!({"message": "x"}))),
            Err("connection reset".to_string()),
        ]));
        let agent = agent(provider.clone());

        let err = agent
            .reply(vec![Message::user().with_text("go")])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Provider(_)));
        assert_eq!(provider.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn test_round_cap_leaves_reply_incomplete() -> anyhow::Result<()> {
        let looping: Vec<Message> = (0..5)
            .map(|i| {
                Message::assistant().with_tool_call(format!("call-{}", i), "echo", json!({"message": "again"}))
            })
            .collect();
        let provider = Arc::new(MockProvider::new(looping));
        let agent = agent(provider.clone()).with_max_rounds(2);

        let reply = agent.reply(vec![Message::user().with_text("loop")]).await?;

        assert!(!reply.complete);
        assert_eq!(reply.messages.last().map(|m| m.role), Some(Role::Tool));
        assert_eq!(provider.requests().await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_invalid_history() {
        let provider = Arc::new(MockProvider::new(vec![]));
        let agent = agent(provider.clone());

        let err = agent.reply(vec![]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let orphan = Message::tool().with_tool_result("nope", "result");
        let err = agent
            .reply(vec![Message::user().with_text("hi"), orphan])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conversation(_)));
        assert!(provider.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_resumes_after_tool_message() -> anyhow::Result<()> {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_text("The echo said hello."),
        ]));
        let agent = agent(provider.clone());

        let reply = agent
            .reply(vec![
                Message::user().with_text("echo hello"),
                Message::assistant().with_tool_call("c1", "echo", json!({"message": "hello"})),
                Message::tool().with_tool_result("c1", "hello"),
            ])
            .await?;

        assert!(reply.complete);
        assert_eq!(reply.messages.len(), 4);
        assert_eq!(reply.messages[3].content, "The echo said hello.");

        let requests = provider.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 3);
        Ok(())
    }
}
