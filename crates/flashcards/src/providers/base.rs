use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::message::Message;
use crate::models::tool::{Tool, ToolChoice};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Callback receiving streamed text as it arrives
pub type TokenSink<'a> = &'a mut (dyn FnMut(&str) + Send);

/// Base trait for AI providers (OpenAI, Anthropic, etc)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next assistant message for the conversation.
    ///
    /// With a forced `tool_choice` the provider is expected to answer with a
    /// tool call; callers still check, as not every model honors it.
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: &ToolChoice,
    ) -> Result<(Message, Usage)>;

    /// Generate a plain text reply, passing text to `on_token` as it arrives.
    ///
    /// Providers without a streaming transport deliver the full reply as one token.
    async fn stream(
        &self,
        system: &str,
        messages: &[Message],
        on_token: TokenSink<'_>,
    ) -> Result<Message> {
        let (message, _) = self
            .complete(system, messages, &[], &ToolChoice::Auto)
            .await?;
        if !message.content.is_empty() {
            on_token(&message.content);
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_usage_serialization() -> Result<()> {
        let usage = Usage::new(Some(10), Some(20), Some(30));
        let serialized = serde_json::to_string(&usage)?;
        let deserialized: Usage = serde_json::from_str(&serialized)?;
        assert_eq!(usage, deserialized);

        let json_value: serde_json::Value = serde_json::from_str(&serialized)?;
        assert_eq!(json_value["input_tokens"], json!(10));
        assert_eq!(json_value["total_tokens"], json!(30));
        Ok(())
    }
}
