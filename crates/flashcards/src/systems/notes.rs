use async_trait::async_trait;
use indoc::indoc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::system::{parse_arguments, to_json, System};
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};
use crate::store::NoteStore;

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Serialize)]
struct NotePreview {
    id: i64,
    preview: String,
    created_at: String,
    total_lines: usize,
}

#[derive(Debug, Deserialize)]
struct ReadNoteInput {
    note_id: i64,
    #[serde(default)]
    line_number_start: Option<usize>,
    #[serde(default)]
    line_number_end: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ReadNoteOutput {
    note_id: i64,
    content: String,
    line_start: usize,
    line_end: usize,
    total_lines: usize,
}

/// Read access to the user's study notes
pub struct NotesSystem {
    tools: Vec<Tool>,
    notes: Arc<dyn NoteStore>,
}

impl NotesSystem {
    pub fn new(notes: Arc<dyn NoteStore>) -> Self {
        let list_notes = Tool::new(
            "list_notes",
            "Lists all notes with preview information including ID, preview of content, and creation date",
            json!({"type": "object", "properties": {}}),
        );
        let read_note = Tool::new(
            "read_note",
            "Reads the content of a specific note with optional line number range",
            json!({
                "type": "object",
                "required": ["note_id"],
                "properties": {
                    "note_id": {"type": "integer", "description": "The ID of the note to read"},
                    "line_number_start": {"type": "integer", "description": "Starting line number (default: 1)"},
                    "line_number_end": {"type": "integer", "description": "Ending line number (default: end of file)"}
                }
            }),
        );
        Self {
            tools: vec![list_notes, read_note],
            notes,
        }
    }

    async fn list_notes(&self) -> AgentResult<String> {
        let previews: Vec<NotePreview> = self
            .notes
            .get_all()
            .await?
            .into_iter()
            .map(|note| {
                let mut preview: String = note.content.chars().take(PREVIEW_CHARS).collect();
                if note.content.chars().count() > PREVIEW_CHARS {
                    preview.push_str("...");
                }
                NotePreview {
                    id: note.id,
                    preview,
                    created_at: note.created_at.to_rfc3339(),
                    total_lines: note.content.split('\n').count(),
                }
            })
            .collect();
        to_json(&previews)
    }

    async fn read_note(&self, input: ReadNoteInput) -> AgentResult<String> {
        let note = self.notes.get_by_id(input.note_id).await?;
        let lines: Vec<&str> = note.content.split('\n').collect();
        let total_lines = lines.len();

        let start = input.line_number_start.filter(|start| *start > 0).unwrap_or(1);
        let end = input
            .line_number_end
            .filter(|end| *end > 0 && *end <= total_lines)
            .unwrap_or(total_lines);

        if start > total_lines {
            return Err(AgentError::InvalidParameters(format!(
                "start line {} exceeds total lines {}",
                start, total_lines
            )));
        }
        if start > end {
            return Err(AgentError::InvalidParameters(format!(
                "start line {} cannot be greater than end line {}",
                start, end
            )));
        }

        to_json(&ReadNoteOutput {
            note_id: note.id,
            content: lines[start - 1..end].join("\n"),
            line_start: start,
            line_end: end,
            total_lines,
        })
    }
}

#[async_trait]
impl System for NotesSystem {
    fn name(&self) -> &str {
        "NotesSystem"
    }

    fn description(&self) -> &str {
        "Browse and read the user's study notes"
    }

    fn instructions(&self) -> &str {
        indoc! {r#"
            Notes are identified by integer ids. Use list_notes to discover them, then
            read_note with a line range to read only the section you need. Line numbers
            are 1-based and inclusive.
        "#}
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: &ToolCall) -> AgentResult<String> {
        match tool_call.name.as_str() {
            "list_notes" => self.list_notes().await,
            "read_note" => self.read_note(parse_arguments(tool_call)?).await,
            _ => Err(AgentError::ToolNotFound(tool_call.name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryNoteStore;
    use serde_json::Value;

    fn system() -> NotesSystem {
        let long = "x".repeat(150);
        NotesSystem::new(Arc::new(InMemoryNoteStore::with_notes([
            "line one\nline two\nline three".to_string(),
            long,
        ])))
    }

    async fn call(system: &NotesSystem, name: &str, arguments: Value) -> AgentResult<String> {
        system.call(&ToolCall::new("1", name, arguments)).await
    }

    #[tokio::test]
    async fn test_list_notes_previews() {
        let out = call(&system(), "list_notes", json!({})).await.unwrap();
        let previews: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(previews[0]["id"], 1);
        assert_eq!(previews[0]["total_lines"], 3);
        let preview = previews[1]["preview"].as_str().unwrap();
        assert_eq!(preview.len(), 103);
        assert!(preview.ends_with("..."));
    }

    #[tokio::test]
    async fn test_read_note_range() {
        let system = system();
        let out = call(&system, "read_note", json!({"note_id": 1, "line_number_start": 2}))
            .await
            .unwrap();
        let result: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(result["content"], "line two\nline three");
        assert_eq!(result["line_start"], 2);
        assert_eq!(result["line_end"], 3);

        // end past the last line is clamped
        let out = call(
            &system,
            "read_note",
            json!({"note_id": 1, "line_number_start": 1, "line_number_end": 40}),
        )
        .await
        .unwrap();
        let result: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(result["line_end"], 3);
    }

    #[tokio::test]
    async fn test_read_note_errors() {
        let system = system();
        let err = call(&system, "read_note", json!({"note_id": 1, "line_number_start": 5}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exceeds total lines 3"));

        let err = call(
            &system,
            "read_note",
            json!({"note_id": 1, "line_number_start": 3, "line_number_end": 2}),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("cannot be greater than end line"));

        let err = call(&system, "read_note", json!({"note_id": 42})).await.unwrap_err();
        assert!(matches!(err, AgentError::ExecutionError(_)));
    }
}
