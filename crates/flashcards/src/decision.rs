//! Forced structured decisions.
//!
//! A protocol step offers the provider a small closed set of tools and requires
//! it to call exactly one of them. The call is decoded into a typed decision,
//! usually an enum deserialized with `#[serde(tag = "name", content = "arguments")]`
//! so each variant lines up with one tool.
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::{ServiceError, ServiceResult};
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall, ToolChoice};
use crate::providers::base::Provider;

/// The closed vocabulary of tools allowed for one decision step
#[derive(Debug, Clone)]
pub struct DecisionSet {
    tools: Vec<Tool>,
}

impl DecisionSet {
    pub fn new(tools: Vec<Tool>) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|tool| tool.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name.as_str()).collect()
    }
}

/// Decode a tool call into a tagged decision type.
///
/// Arguments that never parsed as JSON, or that don't fit the variant, make the
/// decision malformed.
pub fn decode_decision<D: DeserializeOwned>(call: &ToolCall) -> ServiceResult<D> {
    let arguments = match &call.arguments {
        Value::Null => json!({}),
        Value::String(raw) => {
            return Err(ServiceError::MalformedDecision(format!(
                "arguments for '{}' are not valid JSON: {}",
                call.name, raw
            )))
        }
        arguments => arguments.clone(),
    };

    serde_json::from_value(json!({"name": call.name, "arguments": arguments})).map_err(|err| {
        ServiceError::MalformedDecision(format!("could not decode '{}': {}", call.name, err))
    })
}

/// Runs a single provider call under a required tool choice and decodes the answer
#[derive(Clone)]
pub struct DecisionExtractor {
    provider: Arc<dyn Provider>,
}

impl DecisionExtractor {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Ask the provider to pick one member of `set`, or exactly `pinned` when given.
    pub async fn decide<D: DeserializeOwned>(
        &self,
        system: &str,
        messages: &[Message],
        set: &DecisionSet,
        pinned: Option<&str>,
    ) -> ServiceResult<D> {
        let tool_choice = match pinned {
            Some(name) if set.contains(name) => ToolChoice::Tool(name.to_string()),
            Some(name) => {
                return Err(ServiceError::MalformedDecision(format!(
                    "'{}' is not one of {:?}",
                    name,
                    set.names()
                )))
            }
            None => ToolChoice::Required,
        };

        let (response, usage) = self
            .provider
            .complete(system, messages, set.tools(), &tool_choice)
            .await?;
        debug!(?usage, tool_calls = response.tool_calls.len(), "decision response");

        let call = match response.tool_calls.as_slice() {
            [] => {
                return Err(ServiceError::MalformedDecision(
                    "no tool call in provider response".to_string(),
                ))
            }
            [call] => call,
            [call, rest @ ..] => {
                warn!(
                    chosen = %call.name,
                    ignored = rest.len(),
                    "provider returned more than one decision, using the first"
                );
                call
            }
        };

        if !set.contains(&call.name) {
            return Err(ServiceError::MalformedDecision(format!(
                "unknown decision '{}', expected one of {:?}",
                call.name,
                set.names()
            )));
        }
        if let Some(name) = pinned {
            if call.name != name {
                return Err(ServiceError::MalformedDecision(format!(
                    "expected '{}' but the provider chose '{}'",
                    name, call.name
                )));
            }
        }

        debug!(decision = %call.name, "decision extracted");
        decode_decision(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    #[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
    enum Step {
        Ask { message: String },
        Done { count: u32 },
    }

    fn set() -> DecisionSet {
        DecisionSet::new(vec![
            Tool::new("ask", "Ask something", json!({"type": "object"})),
            Tool::new("done", "Finish", json!({"type": "object"})),
        ])
    }

    fn extractor(responses: Vec<Message>) -> (Arc<MockProvider>, DecisionExtractor) {
        let provider = Arc::new(MockProvider::new(responses));
        (provider.clone(), DecisionExtractor::new(provider))
    }

    #[tokio::test]
    async fn test_decodes_known_decision() {
        let (provider, extractor) = extractor(vec![
            Message::assistant().with_tool_call("1", "done", json!({"count": 3}))
        ]);
        let step: Step = extractor
            .decide("system", &[Message::user().with_text("hi")], &set(), None)
            .await
            .unwrap();
        assert_eq!(step, Step::Done { count: 3 });

        let requests = provider.requests().await;
        assert_eq!(requests[0].tool_choice, ToolChoice::Required);
        assert_eq!(requests[0].tool_names, vec!["ask", "done"]);
    }

    #[tokio::test]
    async fn test_pinned_choice_is_forwarded_and_enforced() {
        let (provider, extractor) = extractor(vec![
            Message::assistant().with_tool_call("1", "done", json!({"count": 1}))
        ]);
        let result: ServiceResult<Step> = extractor.decide("system", &[], &set(), Some("ask")).await;
        assert!(matches!(result, Err(ServiceError::MalformedDecision(_))));
        assert_eq!(
            provider.requests().await[0].tool_choice,
            ToolChoice::Tool("ask".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_or_unknown_calls_are_malformed() {
        let (_, extractor) = extractor(vec![
            Message::assistant().with_text("I'd rather chat"),
            Message::assistant().with_tool_call("1", "explode", json!({})),
            Message::assistant().with_tool_call("1", "done", json!({"count": "many"})),
            Message::assistant().with_tool_call("1", "done", Value::String("{broken".into())),
        ]);
        for _ in 0..4 {
            let result: ServiceResult<Step> = extractor.decide("system", &[], &set(), None).await;
            assert!(matches!(result, Err(ServiceError::MalformedDecision(_))));
        }
    }

    #[tokio::test]
    async fn test_first_of_several_calls_wins() {
        let (_, extractor) = extractor(vec![Message::assistant()
            .with_tool_call("1", "ask", json!({"message": "how many?"}))
            .with_tool_call("2", "done", json!({"count": 2}))]);
        let step: Step = extractor.decide("system", &[], &set(), None).await.unwrap();
        assert_eq!(
            step,
            Step::Ask {
                message: "how many?".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_provider_error_is_not_a_decision_error() {
        let provider = Arc::new(MockProvider::scripted(vec![Err("timeout".to_string())]));
        let extractor = DecisionExtractor::new(provider);
        let result: ServiceResult<Step> = extractor.decide("system", &[], &set(), None).await;
        assert!(matches!(result, Err(ServiceError::Provider(_))));
    }

    #[test]
    fn test_null_arguments_decode_as_empty_object() {
        #[derive(Debug, Deserialize)]
        #[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
        enum Ping {
            Ping {},
        }
        let call = ToolCall::new("1", "ping", Value::Null);
        assert!(decode_decision::<Ping>(&call).is_ok());
    }
}
