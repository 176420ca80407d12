use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form text the assistant keeps about the user between conversations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            content: String::new(),
            updated_at: Utc::now(),
        }
    }
}
