use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::errors::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum KnowledgeCheckState {
    Pending,
    Completed,
}

/// A planned or finished check of the user's understanding of a note excerpt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeCheck {
    pub id: i64,
    pub note_id: i64,
    pub line_number_start: u32,
    pub line_number_end: u32,
    pub state: KnowledgeCheckState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_score_explanation: Option<String>,
    pub topic_summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewKnowledgeCheck {
    pub note_id: i64,
    pub line_number_start: u32,
    pub line_number_end: u32,
    pub topic_summary: String,
}

/// A partial update; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeCheckUpdate {
    pub state: Option<KnowledgeCheckState>,
    pub user_score: Option<u8>,
    pub user_score_explanation: Option<String>,
    pub topic_summary: Option<String>,
}

impl NewKnowledgeCheck {
    /// Check the line range and summary, trimming the summary in place
    pub fn validate(&mut self) -> Result<(), StoreError> {
        if self.note_id <= 0 {
            return Err(invalid("note ID must be positive"));
        }
        if self.line_number_start == 0 || self.line_number_end == 0 {
            return Err(invalid("line numbers must be positive"));
        }
        if self.line_number_start > self.line_number_end {
            return Err(invalid(
                "line number start cannot be greater than line number end",
            ));
        }
        self.topic_summary = self.topic_summary.trim().to_string();
        if self.topic_summary.is_empty() {
            return Err(invalid("topic summary is required"));
        }
        Ok(())
    }
}

impl KnowledgeCheckUpdate {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.is_empty() {
            return Err(invalid("at least one field must be provided for update"));
        }
        if let Some(score) = self.user_score {
            if !(1..=10).contains(&score) {
                return Err(invalid("user score must be between 1 and 10"));
            }
        }
        if let Some(summary) = &self.topic_summary {
            if summary.trim().is_empty() {
                return Err(invalid("topic summary cannot be empty"));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_none()
            && self.user_score.is_none()
            && self.user_score_explanation.is_none()
            && self.topic_summary.is_none()
    }
}

fn invalid(message: &str) -> StoreError {
    StoreError::Invalid {
        kind: "knowledge check",
        message: message.to_string(),
    }
}
