use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single tool invocation. These never abort a conversation: the
/// agent loop renders them into the tool result text.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Errors raised by the storage collaborators.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid {kind}: {message}")]
    Invalid { kind: &'static str, message: String },

    #[error("Storage failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AgentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Invalid { .. } => AgentError::InvalidParameters(err.to_string()),
            _ => AgentError::ExecutionError(err.to_string()),
        }
    }
}

/// A message sequence that breaks the conversation rules. This is a contract
/// violation by the caller, not something to show an end user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversationError {
    #[error("{role} message cannot carry tool calls")]
    UnexpectedToolCalls { role: String },

    #[error("{role} message cannot carry tool results")]
    UnexpectedToolResults { role: String },

    #[error("Tool message must carry at least one tool result")]
    EmptyToolMessage,

    #[error("Duplicate tool call id '{0}' in one assistant turn")]
    DuplicateToolCallId(String),

    #[error("Tool result references unknown tool call id '{0}'")]
    UnknownToolCallId(String),
}

/// Failures of the service-level operations (agent chat and quiz protocols).
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Missing or invalid caller input, rejected before any provider call.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The LLM call itself failed: network, authentication or a malformed envelope.
    #[error("Provider request failed: {0}")]
    Provider(#[from] anyhow::Error),

    /// The provider ignored a required tool choice or answered with an unusable call.
    #[error("Malformed decision: {0}")]
    MalformedDecision(String),

    #[error("Invalid conversation: {0}")]
    Conversation(#[from] ConversationError),

    #[error("Store failure: {0}")]
    Store(String),

    #[error("Failed to render prompt: {0}")]
    Prompt(#[from] tera::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ServiceError::NotFound(err.to_string()),
            StoreError::Invalid { .. } => ServiceError::Validation(err.to_string()),
            StoreError::Backend(message) => ServiceError::Store(message),
        }
    }
}

impl ServiceError {
    /// Whether the caller can fix the request and try again.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::Validation(_) | ServiceError::NotFound(_))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
