use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::base::{Provider, Usage};
use super::configs::AnthropicProviderConfig;
use super::utils::sanitize_function_name;
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall, ToolChoice};

pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
pub const ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: i32 = 4096;

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let usage = &data["usage"];
        let input_tokens = usage["input_tokens"].as_i64().map(|v| v as i32);
        let output_tokens = usage["output_tokens"].as_i64().map(|v| v as i32);
        let total_tokens = match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        };
        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    /// Tool results travel as `tool_result` blocks inside a user turn. Empty text
    /// is never sent, and a message left with no blocks is dropped.
    fn messages_to_anthropic_spec(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .filter_map(|message| {
                let mut blocks = Vec::new();
                if message.role != Role::Tool {
                    if let Some(text) = message.text() {
                        blocks.push(json!({"type": "text", "text": text}));
                    }
                }
                match message.role {
                    Role::User => {}
                    Role::Assistant => {
                        for call in &message.tool_calls {
                            let input = match &call.arguments {
                                Value::Object(_) => call.arguments.clone(),
                                _ => json!({}),
                            };
                            blocks.push(json!({
                                "type": "tool_use",
                                "id": call.id,
                                "name": sanitize_function_name(&call.name),
                                "input": input,
                            }));
                        }
                    }
                    Role::Tool => {
                        blocks.extend(message.tool_results.iter().map(|result| {
                            json!({
                                "type": "tool_result",
                                "tool_use_id": result.tool_call_id,
                                "content": result.content,
                            })
                        }));
                    }
                }
                if blocks.is_empty() {
                    return None;
                }
                let role = match message.role {
                    Role::Assistant => "assistant",
                    Role::User | Role::Tool => "user",
                };
                Some(json!({"role": role, "content": blocks}))
            })
            .collect()
    }

    fn tools_to_anthropic_spec(tools: &[Tool]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.input_schema,
                })
            })
            .collect()
    }

    fn tool_choice_to_anthropic_spec(tool_choice: &ToolChoice) -> Value {
        match tool_choice {
            ToolChoice::Auto => json!({"type": "auto"}),
            ToolChoice::Required => json!({"type": "any"}),
            ToolChoice::Tool(name) => json!({"type": "tool", "name": name}),
        }
    }

    fn response_to_message(response: &Value) -> Result<Message> {
        let blocks = response
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| anyhow!("Invalid response format from Anthropic API"))?;

        let mut message = Message::assistant();
        for block in blocks {
            match block["type"].as_str() {
                Some("text") => {
                    if let Some(text) = block["text"].as_str() {
                        message = message.with_text(text);
                    }
                }
                Some("tool_use") => {
                    message.tool_calls.push(ToolCall::new(
                        block["id"].as_str().unwrap_or_default(),
                        block["name"].as_str().unwrap_or_default(),
                        block.get("input").cloned().unwrap_or_else(|| json!({})),
                    ));
                }
                _ => {}
            }
        }
        Ok(message)
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            status => {
                let error_text = response.text().await?;
                Err(anyhow!("Request failed: {} - {}", status, error_text))
            }
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: &ToolChoice,
    ) -> Result<(Message, Usage)> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": Self::messages_to_anthropic_spec(messages),
            "max_tokens": self.config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
        });

        if !system.is_empty() {
            payload["system"] = json!(system);
        }
        if !tools.is_empty() {
            payload["tools"] = json!(Self::tools_to_anthropic_spec(tools));
            payload["tool_choice"] = Self::tool_choice_to_anthropic_spec(tool_choice);
        }
        if let Some(temp) = self.config.temperature {
            payload["temperature"] = json!(temp);
        }

        debug!(model = %self.config.model, messages = messages.len(), tools = tools.len(), "anthropic completion");
        let response = self.post(payload).await?;

        let message = Self::response_to_message(&response)?;
        let usage = Self::get_usage(&response);

        Ok((message, usage))
    }
}
