use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::QuizStore;
use crate::errors::{StoreError, StoreResult};
use crate::models::quiz::{Quiz, QuizConfig};

#[derive(Debug, Default)]
struct Quizzes {
    next_id: i64,
    by_id: BTreeMap<i64, Quiz>,
}

/// Quiz records held in process memory
#[derive(Debug, Default)]
pub struct InMemoryQuizStore {
    inner: RwLock<Quizzes>,
}

impl InMemoryQuizStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(id: i64) -> StoreError {
    StoreError::NotFound {
        kind: "quiz",
        id: id.to_string(),
    }
}

#[async_trait]
impl QuizStore for InMemoryQuizStore {
    async fn create(&self, config: QuizConfig, llm_context: String) -> StoreResult<Quiz> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let now = Utc::now();
        let quiz = Quiz {
            id: inner.next_id,
            config,
            llm_context,
            asked_questions: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        inner.by_id.insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Quiz> {
        self.inner
            .read()
            .await
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn get_all(&self) -> StoreResult<Vec<Quiz>> {
        Ok(self.inner.read().await.by_id.values().cloned().collect())
    }

    async fn update(&self, id: i64, asked_questions: Vec<String>) -> StoreResult<Quiz> {
        let mut inner = self.inner.write().await;
        let quiz = inner.by_id.get_mut(&id).ok_or_else(|| not_found(id))?;
        quiz.asked_questions = asked_questions;
        quiz.updated_at = Utc::now();
        Ok(quiz.clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        self.inner
            .write()
            .await
            .by_id
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }
}
