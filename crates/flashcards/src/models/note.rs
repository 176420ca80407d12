use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A study note: opaque text with an identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn new<S: Into<String>>(id: i64, content: S) -> Self {
        Self {
            id,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn total_lines(&self) -> usize {
        self.content.lines().count()
    }
}

/// The relevance of one note to a set of topics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedNote {
    pub note_id: i64,
    /// Always within [0, 1]
    pub score: f64,
}
