use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{chat_history, clean_topics, ConfigureOutcome, QuizService};
use crate::decision::DecisionSet;
use crate::errors::ServiceResult;
use crate::models::message::Message;
use crate::models::quiz::{NoteQuizConfig, QuizConfig};
use crate::models::tool::Tool;

/// Most questions a note-based quiz may ask
pub const MAX_NOTE_QUIZ_QUESTIONS: u32 = 50;
/// Most questions a persisted quiz may ask
pub const MAX_QUIZ_QUESTIONS: u32 = 5;

#[derive(Debug, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
enum ConfigureDecision {
    ContinueInterview {
        message: String,
    },
    FinalizeQuizConfig {
        question_count: u32,
        topics: Vec<String>,
        #[serde(default)]
        reasoning: String,
    },
}

fn configure_set(max_questions: u32, topics_description: &str) -> DecisionSet {
    DecisionSet::new(vec![
        Tool::new(
            "continue_interview",
            "Continue interviewing the user to gather more information about their quiz preferences",
            json!({
                "type": "object",
                "required": ["message"],
                "properties": {
                    "message": {"type": "string", "description": "The message to send to the user to continue the interview"}
                }
            }),
        ),
        Tool::new(
            "finalize_quiz_config",
            "Finalize the quiz configuration based on the user's preferences",
            json!({
                "type": "object",
                "required": ["question_count", "topics", "reasoning"],
                "properties": {
                    "question_count": {
                        "type": "integer",
                        "description": "Number of questions for the quiz",
                        "minimum": 1,
                        "maximum": max_questions
                    },
                    "topics": {
                        "type": "array",
                        "description": topics_description,
                        "items": {"type": "string"}
                    },
                    "reasoning": {"type": "string", "description": "Brief explanation of the configuration choices"}
                }
            }),
        ),
    ])
}

fn clamp_question_count(question_count: u32, max: u32) -> u32 {
    if question_count == 0 || question_count > max {
        warn!(question_count, max, "question count out of range, clamping");
    }
    question_count.clamp(1, max)
}

fn clarify(topics: &[String]) -> String {
    format!(
        "I couldn't find any notes about {}. Could you specify different topics or be more specific about what you'd like to study?",
        topics.join(", ")
    )
}

impl QuizService {
    /// One round of the note-based configuration interview.
    ///
    /// Finalized topics are matched against note content exactly as the model
    /// extracted them; when nothing matches the user is asked to clarify.
    pub async fn configure_quiz(
        &self,
        messages: &[Message],
    ) -> ServiceResult<ConfigureOutcome<NoteQuizConfig>> {
        info!(messages = messages.len(), "configuring note quiz");
        let history = chat_history(messages)?;
        let system = self.render("quiz_configure.md", &json!({}))?;
        let set = configure_set(
            MAX_NOTE_QUIZ_QUESTIONS,
            "Array of EXACT topic keywords that the user specifically mentioned. Do not add related or interpreted terms - only use the user's exact words.",
        );

        match self.decisions.decide(&system, &history, &set, None).await? {
            ConfigureDecision::ContinueInterview { message } => {
                Ok(ConfigureOutcome::Continue { message })
            }
            ConfigureDecision::FinalizeQuizConfig {
                question_count,
                topics,
                reasoning,
            } => {
                let notes = self.notes.search_by_content(&topics).await?;
                info!(?topics, matched = notes.len(), "searched notes for quiz topics");
                if notes.is_empty() {
                    return Ok(ConfigureOutcome::Continue {
                        message: clarify(&topics),
                    });
                }

                Ok(ConfigureOutcome::Configure {
                    message: reasoning,
                    config: NoteQuizConfig {
                        note_ids: notes.iter().map(|note| note.id).collect(),
                        question_count: clamp_question_count(question_count, MAX_NOTE_QUIZ_QUESTIONS),
                        topic: topics.join(", "),
                    },
                })
            }
        }
    }

    /// One round of the configuration interview for a persisted quiz.
    ///
    /// Topics are kept as whole phrases. Finalizing checks that the topic index
    /// has material for them, but nothing is stored until [`QuizService::create_quiz`].
    pub async fn configure_quiz_v2(
        &self,
        messages: &[Message],
    ) -> ServiceResult<ConfigureOutcome<QuizConfig>> {
        info!(messages = messages.len(), "configuring quiz");
        let history = chat_history(messages)?;
        let system = self.render(
            "quiz_configure_v2.md",
            &json!({"max_questions": MAX_QUIZ_QUESTIONS}),
        )?;
        let set = configure_set(
            MAX_QUIZ_QUESTIONS,
            "Array of complete topic phrases that the user mentioned. Keep topic phrases intact (e.g., 'testing distributed systems' as one topic, not split into separate words). Only create multiple array items if user mentions multiple distinct subjects.",
        );

        match self.decisions.decide(&system, &history, &set, None).await? {
            ConfigureDecision::ContinueInterview { message } => {
                Ok(ConfigureOutcome::Continue { message })
            }
            ConfigureDecision::FinalizeQuizConfig {
                question_count,
                topics,
                reasoning,
            } => {
                let topics = clean_topics(&topics);
                if topics.is_empty() {
                    return Ok(ConfigureOutcome::Continue {
                        message: "Which topics would you like the quiz to cover?".to_string(),
                    });
                }

                let probe = self.topics.query_topic_chunks(&topics, 1).await?;
                if probe.is_empty() {
                    info!(?topics, "no study material for quiz topics");
                    return Ok(ConfigureOutcome::Continue {
                        message: clarify(&topics),
                    });
                }

                Ok(ConfigureOutcome::Configure {
                    message: reasoning,
                    config: QuizConfig {
                        question_count: clamp_question_count(question_count, MAX_QUIZ_QUESTIONS),
                        topics,
                    },
                })
            }
        }
    }
}
