use crate::error::ApiError;
use crate::routes::StreamResponse;
use crate::state::AppState;
use axum::{extract::State, routing::post, Json, Router};
use flashcards::{
    agent::AgentReply,
    errors::ServiceError,
    models::{conversation::Conversation, message::Message, role::Role},
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;

#[derive(Debug, Deserialize)]
struct ChatRequest {
    messages: Vec<Message>,
}

// Line-oriented stream protocol: a type prefix, then a JSON payload
struct ProtocolFormatter;

impl ProtocolFormatter {
    fn format_text(text: &str) -> String {
        let encoded_text = serde_json::to_string(text).unwrap_or_default();
        format!("0:{}\n", encoded_text)
    }

    fn format_tool_call(id: &str, name: &str, args: &Value) -> String {
        let tool_call = json!({
            "toolCallId": id,
            "toolName": name,
            "args": args
        });
        format!("9:{}\n", tool_call)
    }

    fn format_tool_result(id: &str, output: &str) -> String {
        let result = json!({
            "toolCallId": id,
            "result": output,
        });
        format!("a:{}\n", result)
    }

    fn format_finish(reason: &str) -> String {
        let finish = json!({ "finishReason": reason });
        format!("d:{}\n", finish)
    }
}

fn format_message(message: &Message) -> Vec<String> {
    let mut lines = Vec::new();
    match message.role {
        Role::Tool => {
            for result in &message.tool_results {
                lines.push(ProtocolFormatter::format_tool_result(
                    &result.tool_call_id,
                    &result.content,
                ));
            }
        }
        Role::Assistant => {
            for line in message.content.lines() {
                lines.push(ProtocolFormatter::format_text(&format!("{}\n", line)));
            }
            for call in &message.tool_calls {
                lines.push(ProtocolFormatter::format_tool_call(
                    &call.id,
                    &call.name,
                    &call.arguments,
                ));
            }
        }
        // the loop never appends user turns
        Role::User => {}
    }
    lines
}

fn validate(messages: &[Message]) -> Result<(), ServiceError> {
    if messages.is_empty() {
        return Err(ServiceError::Validation("messages are required".to_string()));
    }
    Conversation::from_messages(messages.iter().cloned())?;
    Ok(())
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<AgentReply>, ApiError> {
    Ok(Json(state.agent.reply(request.messages).await?))
}

async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<StreamResponse<ReceiverStream<String>>, ApiError> {
    // reject bad input while a status code can still be sent
    validate(&request.messages)?;

    let (tx, rx) = mpsc::channel(100);
    let agent = state.agent.clone();

    tokio::spawn(async move {
        let mut stream = match agent.reply_stream(request.messages).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("Failed to start reply stream: {}", e);
                let _ = tx.send(ProtocolFormatter::format_finish("error")).await;
                return;
            }
        };

        let mut reason = "stop";
        loop {
            match timeout(Duration::from_millis(500), stream.next()).await {
                Ok(Some(Ok(message))) => {
                    for line in format_message(&message) {
                        if tx.send(line).await.is_err() {
                            tracing::debug!("client disconnected, stopping reply");
                            return;
                        }
                    }
                }
                Ok(Some(Err(e))) => {
                    tracing::error!("Error processing message: {}", e);
                    reason = "error";
                    break;
                }
                Ok(None) => break,
                // Heartbeat, used to detect disconnected clients and stop running tools
                Err(_) => {
                    if tx.is_closed() {
                        return;
                    }
                }
            }
        }

        let _ = tx.send(ProtocolFormatter::format_finish(reason)).await;
    });

    Ok(StreamResponse::new(ReceiverStream::new(rx)))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/agent/chat", post(chat))
        .route("/agent/chat/stream", post(chat_stream))
        .with_state(state)
}
