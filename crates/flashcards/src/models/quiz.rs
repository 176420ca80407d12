use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Settings of a persisted (v2) quiz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizConfig {
    pub question_count: u32,
    pub topics: Vec<String>,
}

/// A persisted quiz. The retrieval context is kept server side only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub config: QuizConfig,
    #[serde(skip)]
    pub llm_context: String,
    #[serde(default)]
    pub asked_questions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Note-based (v1) quiz settings produced by the configuration interview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteQuizConfig {
    pub note_ids: Vec<i64>,
    pub question_count: u32,
    pub topic: String,
}

/// The verdict on a user's answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizEvaluation {
    pub correct: bool,
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encouragement: Option<String>,
}
