use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{NoteStore, TopicIndex};
use crate::errors::StoreResult;
use crate::matcher;

/// A topic index over the note store: notes are split into paragraphs and a
/// paragraph is relevant when it fuzzy matches one of the topics.
pub struct NoteTopicIndex {
    notes: Arc<dyn NoteStore>,
}

impl NoteTopicIndex {
    pub fn new(notes: Arc<dyn NoteStore>) -> Self {
        Self { notes }
    }
}

fn paragraphs(content: &str) -> impl Iterator<Item = &str> {
    content
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
}

#[async_trait]
impl TopicIndex for NoteTopicIndex {
    async fn query_topic_chunks(&self, topics: &[String], limit: usize) -> StoreResult<Vec<String>> {
        let notes = self.notes.get_all().await?;

        let mut chunks: Vec<String> = Vec::new();
        for note in &notes {
            for paragraph in paragraphs(&note.content) {
                if matcher::matches(paragraph, topics) {
                    chunks.push(format!("Section: note {}\n--------------\n{}", note.id, paragraph));
                }
            }
        }

        if chunks.is_empty() {
            warn!(?topics, "no chunks found for topics");
            return Ok(chunks);
        }

        chunks.shuffle(&mut rand::thread_rng());
        chunks.truncate(limit);
        debug!(count = chunks.len(), limit, "selected topic chunks");
        Ok(chunks)
    }
}
