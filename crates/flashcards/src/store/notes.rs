use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::NoteStore;
use crate::errors::{StoreError, StoreResult};
use crate::models::note::Note;

const NOTE_EXTENSIONS: &[&str] = &["md", "txt"];

/// Notes held in process memory, ids assigned from 1 upwards
#[derive(Debug, Default)]
pub struct InMemoryNoteStore {
    notes: RwLock<BTreeMap<i64, Note>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notes<I, S>(contents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let notes = contents
            .into_iter()
            .enumerate()
            .map(|(index, content)| {
                let id = index as i64 + 1;
                (id, Note::new(id, content))
            })
            .collect();
        Self {
            notes: RwLock::new(notes),
        }
    }

    pub async fn insert<S: Into<String>>(&self, content: S) -> StoreResult<Note> {
        let content = content.into();
        let content = content.trim();
        if content.is_empty() {
            return Err(StoreError::Invalid {
                kind: "note",
                message: "content cannot be empty".to_string(),
            });
        }

        let mut notes = self.notes.write().await;
        let id = notes.keys().next_back().copied().unwrap_or(0) + 1;
        let note = Note::new(id, content);
        notes.insert(id, note.clone());
        debug!(note_id = id, "stored note");
        Ok(note)
    }

    /// Load every `.md` and `.txt` file of `dir` as a note, in file name order.
    pub async fn load_dir(&self, dir: &Path) -> StoreResult<usize> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| StoreError::Backend(format!("reading {}: {}", dir.display(), e)))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
        {
            let path = entry.path();
            let is_note = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| NOTE_EXTENSIONS.contains(&ext));
            if is_note && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| StoreError::Backend(format!("reading {}: {}", path.display(), e)))?;
            if content.trim().is_empty() {
                continue;
            }
            self.insert(content).await?;
            loaded += 1;
        }

        info!(dir = %dir.display(), loaded, "loaded notes");
        Ok(loaded)
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn get_all(&self) -> StoreResult<Vec<Note>> {
        Ok(self.notes.read().await.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Note> {
        self.notes
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                kind: "note",
                id: id.to_string(),
            })
    }
}
