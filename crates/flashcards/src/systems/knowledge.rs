use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use indoc::indoc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::system::{parse_arguments, to_json, System};
use crate::errors::{AgentError, AgentResult};
use crate::models::knowledge_check::{KnowledgeCheckState, KnowledgeCheckUpdate, NewKnowledgeCheck};
use crate::models::tool::{Tool, ToolCall};
use crate::store::KnowledgeCheckStore;

#[derive(Debug, Deserialize)]
struct MarkCompleteInput {
    knowledge_check_id: i64,
    user_score: u8,
    user_score_explanation: String,
}

#[derive(Debug, Deserialize)]
struct GetInput {
    knowledge_check_id: i64,
}

#[derive(Debug, Default, Deserialize)]
struct ListInput {
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
fn parse_date_time(raw: &str) -> AgentResult<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            AgentError::InvalidParameters(format!(
                "unsupported date format '{}', use YYYY-MM-DD or YYYY-MM-DDTHH:MM:SSZ",
                raw
            ))
        })
}

fn optional_date(raw: Option<&str>) -> AgentResult<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => parse_date_time(raw).map(Some),
        None => Ok(None),
    }
}

/// Planned and completed checks of the user's understanding of note sections
pub struct KnowledgeCheckSystem {
    tools: Vec<Tool>,
    checks: Arc<dyn KnowledgeCheckStore>,
}

impl KnowledgeCheckSystem {
    pub fn new(checks: Arc<dyn KnowledgeCheckStore>) -> Self {
        let tools = vec![
            Tool::new(
                "create_empty_knowledge_check",
                "Creates a new knowledge check in pending state for a specific section of a note",
                json!({
                    "type": "object",
                    "required": ["note_id", "line_number_start", "line_number_end", "topic_summary"],
                    "properties": {
                        "note_id": {"type": "integer", "description": "The ID of the note to create knowledge check for"},
                        "line_number_start": {"type": "integer", "description": "Starting line number of the content section"},
                        "line_number_end": {"type": "integer", "description": "Ending line number of the content section"},
                        "topic_summary": {"type": "string", "description": "Summary of what this section covers"}
                    }
                }),
            ),
            Tool::new(
                "mark_knowledge_check_complete",
                "Marks a knowledge check as completed with user score and explanation",
                json!({
                    "type": "object",
                    "required": ["knowledge_check_id", "user_score", "user_score_explanation"],
                    "properties": {
                        "knowledge_check_id": {"type": "integer", "description": "The ID of the knowledge check to mark as complete"},
                        "user_score": {"type": "integer", "minimum": 1, "maximum": 10, "description": "User's score from 1-10 on this knowledge check"},
                        "user_score_explanation": {"type": "string", "description": "Explanation of why the user received this score"}
                    }
                }),
            ),
            Tool::new(
                "get_knowledge_check",
                "Retrieves a specific knowledge check by ID",
                json!({
                    "type": "object",
                    "required": ["knowledge_check_id"],
                    "properties": {
                        "knowledge_check_id": {"type": "integer", "description": "The ID of the knowledge check to retrieve"}
                    }
                }),
            ),
            Tool::new(
                "list_knowledge_checks",
                "Lists knowledge checks with optional date range filtering",
                json!({
                    "type": "object",
                    "properties": {
                        "start_date": {"type": "string", "description": "Start date (YYYY-MM-DD or RFC 3339), optional"},
                        "end_date": {"type": "string", "description": "End date (YYYY-MM-DD or RFC 3339), optional"}
                    }
                }),
            ),
        ];
        Self { tools, checks }
    }

    async fn list(&self, input: ListInput) -> AgentResult<String> {
        let start = optional_date(input.start_date.as_deref())?;
        let end = optional_date(input.end_date.as_deref())?;

        let checks = if start.is_some() || end.is_some() {
            self.checks.get_by_date_range(start, end).await?
        } else {
            self.checks.get_all().await?
        };
        to_json(&checks)
    }
}

#[async_trait]
impl System for KnowledgeCheckSystem {
    fn name(&self) -> &str {
        "KnowledgeCheckSystem"
    }

    fn description(&self) -> &str {
        "Track which note sections the user has been checked on, and how well they did"
    }

    fn instructions(&self) -> &str {
        indoc! {r#"
            A knowledge check covers a line range of one note. Create it as pending before
            asking the user about the section, then mark it complete with a score from 1 to
            10 and a short explanation once they have answered. Completed checks cannot be
            changed.
        "#}
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: &ToolCall) -> AgentResult<String> {
        match tool_call.name.as_str() {
            "create_empty_knowledge_check" => {
                let input: NewKnowledgeCheck = parse_arguments(tool_call)?;
                to_json(&self.checks.create(input).await?)
            }
            "mark_knowledge_check_complete" => {
                let input: MarkCompleteInput = parse_arguments(tool_call)?;
                let update = KnowledgeCheckUpdate {
                    state: Some(KnowledgeCheckState::Completed),
                    user_score: Some(input.user_score),
                    user_score_explanation: Some(input.user_score_explanation),
                    topic_summary: None,
                };
                to_json(&self.checks.update(input.knowledge_check_id, update).await?)
            }
            "get_knowledge_check" => {
                let input: GetInput = parse_arguments(tool_call)?;
                to_json(&self.checks.get_by_id(input.knowledge_check_id).await?)
            }
            "list_knowledge_checks" => self.list(parse_arguments(tool_call)?).await,
            _ => Err(AgentError::ToolNotFound(tool_call.name.clone())),
        }
    }
}
