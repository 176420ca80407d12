use std::collections::HashSet;

use super::message::Message;
use super::role::Role;
use crate::errors::ConversationError;

/// An append-only, validated sequence of messages.
///
/// Tool calls may only appear on assistant messages, tool results only on tool
/// messages, and every tool result has to answer a still unanswered call of the
/// assistant turn directly before it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
    pending: HashSet<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a conversation from an existing history, validating every message.
    pub fn from_messages<I>(messages: I) -> Result<Self, ConversationError>
    where
        I: IntoIterator<Item = Message>,
    {
        let mut conversation = Self::new();
        for message in messages {
            conversation.push(message)?;
        }
        Ok(conversation)
    }

    pub fn push(&mut self, message: Message) -> Result<(), ConversationError> {
        match message.role {
            Role::Assistant => {
                if !message.tool_results.is_empty() {
                    return Err(ConversationError::UnexpectedToolResults {
                        role: message.role.to_string(),
                    });
                }
                let mut seen = HashSet::new();
                for call in &message.tool_calls {
                    if !seen.insert(call.id.as_str()) {
                        return Err(ConversationError::DuplicateToolCallId(call.id.clone()));
                    }
                }
            }
            Role::Tool => {
                if !message.tool_calls.is_empty() {
                    return Err(ConversationError::UnexpectedToolCalls {
                        role: message.role.to_string(),
                    });
                }
                if message.tool_results.is_empty() {
                    return Err(ConversationError::EmptyToolMessage);
                }
                let mut answered = HashSet::new();
                for result in &message.tool_results {
                    let id = result.tool_call_id.as_str();
                    if !self.pending.contains(id) || !answered.insert(id) {
                        return Err(ConversationError::UnknownToolCallId(
                            result.tool_call_id.clone(),
                        ));
                    }
                }
            }
            Role::User => {
                if !message.tool_calls.is_empty() {
                    return Err(ConversationError::UnexpectedToolCalls {
                        role: message.role.to_string(),
                    });
                }
                if !message.tool_results.is_empty() {
                    return Err(ConversationError::UnexpectedToolResults {
                        role: message.role.to_string(),
                    });
                }
            }
        }

        match message.role {
            Role::Tool => {
                for result in &message.tool_results {
                    self.pending.remove(&result.tool_call_id);
                }
            }
            _ => {
                self.pending = message
                    .tool_calls
                    .iter()
                    .map(|call| call.id.clone())
                    .collect();
            }
        }
        self.messages.push(message);
        Ok(())
    }

    /// A conversation is complete when its last message is not a tool message,
    /// meaning no tool output is waiting for the model to read it.
    pub fn is_complete(&self) -> bool {
        self.messages
            .last()
            .map(|message| message.role != Role::Tool)
            .unwrap_or(true)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
