//! Storage collaborators used by the agent tools and the quiz protocols.
//!
//! Each concern is a trait so the services can be wired to any backend; the
//! submodules provide in-process implementations.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::StoreResult;
use crate::matcher;
use crate::models::knowledge_check::{KnowledgeCheck, KnowledgeCheckUpdate, NewKnowledgeCheck};
use crate::models::memory::Memory;
use crate::models::note::Note;
use crate::models::quiz::{Quiz, QuizConfig};

pub mod knowledge_checks;
pub mod memory;
pub mod notes;
pub mod quizzes;
pub mod topics;

pub use knowledge_checks::InMemoryKnowledgeCheckStore;
pub use memory::{FileMemoryStore, InMemoryMemoryStore};
pub use notes::InMemoryNoteStore;
pub use quizzes::InMemoryQuizStore;
pub use topics::NoteTopicIndex;

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// All notes, ordered by id
    async fn get_all(&self) -> StoreResult<Vec<Note>>;

    async fn get_by_id(&self, id: i64) -> StoreResult<Note>;

    /// Notes matching at least one of `terms`, see [`matcher::matches`].
    ///
    /// Blank terms are dropped first; when none remain every note is returned.
    async fn search_by_content(&self, terms: &[String]) -> StoreResult<Vec<Note>> {
        let terms: Vec<&str> = terms
            .iter()
            .map(|term| term.trim())
            .filter(|term| !term.is_empty())
            .collect();
        let notes = self.get_all().await?;
        if terms.is_empty() {
            return Ok(notes);
        }

        Ok(notes
            .into_iter()
            .filter(|note| matcher::matches(&note.content, &terms))
            .collect())
    }
}

#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn create(&self, config: QuizConfig, llm_context: String) -> StoreResult<Quiz>;

    async fn get_by_id(&self, id: i64) -> StoreResult<Quiz>;

    async fn get_all(&self) -> StoreResult<Vec<Quiz>>;

    /// Replace the asked questions of a quiz
    async fn update(&self, id: i64, asked_questions: Vec<String>) -> StoreResult<Quiz>;

    async fn delete(&self, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn get(&self) -> StoreResult<Memory>;

    async fn update(&self, content: &str) -> StoreResult<Memory>;
}

#[async_trait]
pub trait KnowledgeCheckStore: Send + Sync {
    async fn create(&self, check: NewKnowledgeCheck) -> StoreResult<KnowledgeCheck>;

    async fn get_by_id(&self, id: i64) -> StoreResult<KnowledgeCheck>;

    async fn get_all(&self) -> StoreResult<Vec<KnowledgeCheck>>;

    /// Checks created within the inclusive range; an open bound is unbounded
    async fn get_by_date_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<KnowledgeCheck>>;

    async fn update(&self, id: i64, update: KnowledgeCheckUpdate) -> StoreResult<KnowledgeCheck>;
}

/// Retrieval of study material for a set of topics
#[async_trait]
pub trait TopicIndex: Send + Sync {
    /// At most `limit` text chunks relevant to `topics`, in no particular order
    async fn query_topic_chunks(&self, topics: &[String], limit: usize) -> StoreResult<Vec<String>>;
}
