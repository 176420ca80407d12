//! The quiz protocols: configure a quiz by interviewing the user, rank notes
//! against topics, conduct a quiz round, and free-form question generation.
//!
//! Two generations of the lifecycle live side by side. The note-based one (v1)
//! is stateless and works on explicit note ids; the record-based one (v2) keeps
//! its retrieval context and asked questions in a [`QuizStore`].
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::decision::DecisionExtractor;
use crate::errors::{ServiceError, ServiceResult};
use crate::models::message::Message;
use crate::models::note::Note;
use crate::models::quiz::QuizEvaluation;
use crate::models::role::Role;
use crate::prompt_template::PromptSet;
use crate::providers::base::Provider;
use crate::store::{NoteStore, QuizStore, TopicIndex};

mod conduct;
mod configure;
mod generate;
mod rank;
mod records;

pub use generate::GeneratedQuestion;

/// Result of a configuration round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConfigureOutcome<C> {
    /// Keep interviewing; `message` is shown to the user
    Continue { message: String },
    /// The quiz is configured; `message` explains the choices
    Configure { message: String, config: C },
}

/// Result of a quiz round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConductOutcome {
    /// A question, a clarification or a nudge back on topic
    Continue { message: String },
    /// The user's answer was judged
    Evaluate {
        message: String,
        evaluation: QuizEvaluation,
    },
}

impl ConductOutcome {
    pub fn message(&self) -> &str {
        match self {
            ConductOutcome::Continue { message } | ConductOutcome::Evaluate { message, .. } => message,
        }
    }
}

/// A message as it is rendered into a prompt
#[derive(Debug, Serialize)]
struct HistoryEntry<'a> {
    role: Role,
    content: &'a str,
}

/// Runs the quiz protocols against a provider and the note, quiz and topic stores
pub struct QuizService {
    provider: Arc<dyn Provider>,
    decisions: DecisionExtractor,
    notes: Arc<dyn NoteStore>,
    quizzes: Arc<dyn QuizStore>,
    topics: Arc<dyn TopicIndex>,
    prompts: Arc<PromptSet>,
}

impl QuizService {
    pub fn new(
        provider: Arc<dyn Provider>,
        notes: Arc<dyn NoteStore>,
        quizzes: Arc<dyn QuizStore>,
        topics: Arc<dyn TopicIndex>,
        prompts: Arc<PromptSet>,
    ) -> Self {
        Self {
            decisions: DecisionExtractor::new(provider.clone()),
            provider,
            notes,
            quizzes,
            topics,
            prompts,
        }
    }

    fn render<T: Serialize>(&self, name: &str, context: &T) -> ServiceResult<String> {
        Ok(self.prompts.render(name, context)?)
    }

    /// Fetch the notes with the given ids, failing with the ids that do not exist
    async fn notes_by_ids(&self, note_ids: &[i64]) -> ServiceResult<Vec<Note>> {
        if note_ids.is_empty() {
            return Err(ServiceError::Validation(
                "at least one note id is required".to_string(),
            ));
        }

        let wanted: BTreeSet<i64> = note_ids.iter().copied().collect();
        let notes: Vec<Note> = self
            .notes
            .get_all()
            .await?
            .into_iter()
            .filter(|note| wanted.contains(&note.id))
            .collect();

        if notes.len() != wanted.len() {
            let found: BTreeSet<i64> = notes.iter().map(|note| note.id).collect();
            let missing: Vec<i64> = wanted.difference(&found).copied().collect();
            return Err(ServiceError::NotFound(format!("note ids not found: {:?}", missing)));
        }
        Ok(notes)
    }
}

/// The user/assistant text exchange of a quiz conversation.
///
/// Quiz protocols only deal in plain text turns, so tool traffic is rejected.
fn chat_history(messages: &[Message]) -> ServiceResult<Vec<Message>> {
    messages
        .iter()
        .map(|message| match message.role {
            Role::Tool => Err(ServiceError::Validation(
                "quiz conversations cannot contain tool messages".to_string(),
            )),
            _ if message.has_tool_calls() => Err(ServiceError::Validation(
                "quiz conversations cannot contain tool calls".to_string(),
            )),
            role => Ok(Message {
                role,
                content: message.content.clone(),
                tool_calls: Vec::new(),
                tool_results: Vec::new(),
            }),
        })
        .collect()
}

fn history_entries(messages: &[Message]) -> Vec<HistoryEntry<'_>> {
    messages
        .iter()
        .map(|message| HistoryEntry {
            role: message.role,
            content: &message.content,
        })
        .collect()
}

/// Topics with surrounding whitespace removed and blanks dropped
fn clean_topics(topics: &[String]) -> Vec<String> {
    topics
        .iter()
        .map(|topic| topic.trim())
        .filter(|topic| !topic.is_empty())
        .map(str::to_string)
        .collect()
}
