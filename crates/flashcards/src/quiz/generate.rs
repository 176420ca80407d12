use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::{chat_history, history_entries, QuizService};
use crate::errors::{ServiceError, ServiceResult};
use crate::models::message::Message;
use crate::models::tool::ToolChoice;
use crate::providers::base::TokenSink;

/// A free-form quiz reply: the next question, or feedback on the last answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub content: String,
}

impl QuizService {
    /// System prompt and the conversation to send for a free-form round
    async fn generate_request(
        &self,
        note_ids: &[i64],
        messages: &[Message],
    ) -> ServiceResult<(String, Vec<Message>)> {
        let history = chat_history(messages)?;
        let notes = self.notes_by_ids(note_ids).await?;

        let system = self.render("quiz_generate_system.md", &json!({}))?;
        let prompt = self.render(
            "quiz_generate.md",
            &json!({"notes": notes, "history": history_entries(&history)}),
        )?;
        Ok((system, vec![Message::user().with_text(prompt)]))
    }

    /// Generate the next turn of a free-form quiz without any tools
    pub async fn generate_question(
        &self,
        note_ids: &[i64],
        messages: &[Message],
    ) -> ServiceResult<GeneratedQuestion> {
        info!(notes = note_ids.len(), messages = messages.len(), "generating quiz question");
        let (system, request) = self.generate_request(note_ids, messages).await?;

        let (response, usage) = self
            .provider
            .complete(&system, &request, &[], &ToolChoice::Auto)
            .await
            .map_err(ServiceError::Provider)?;
        info!(?usage, "generated quiz question");

        Ok(GeneratedQuestion {
            content: response.content,
        })
    }

    /// Like [`QuizService::generate_question`], passing text to `on_token` as it arrives
    pub async fn generate_question_stream(
        &self,
        note_ids: &[i64],
        messages: &[Message],
        on_token: TokenSink<'_>,
    ) -> ServiceResult<GeneratedQuestion> {
        info!(notes = note_ids.len(), messages = messages.len(), "streaming quiz question");
        let (system, request) = self.generate_request(note_ids, messages).await?;

        let response = self
            .provider
            .stream(&system, &request, on_token)
            .await
            .map_err(ServiceError::Provider)?;
        info!("finished streaming quiz question");

        Ok(GeneratedQuestion {
            content: response.content,
        })
    }
}
