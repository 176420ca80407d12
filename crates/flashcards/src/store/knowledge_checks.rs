use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::KnowledgeCheckStore;
use crate::errors::{StoreError, StoreResult};
use crate::models::knowledge_check::{
    KnowledgeCheck, KnowledgeCheckState, KnowledgeCheckUpdate, NewKnowledgeCheck,
};

#[derive(Debug, Default)]
struct Checks {
    next_id: i64,
    by_id: BTreeMap<i64, KnowledgeCheck>,
}

/// Knowledge checks held in process memory. Completed checks are immutable.
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeCheckStore {
    inner: RwLock<Checks>,
}

impl InMemoryKnowledgeCheckStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(id: i64) -> StoreError {
    StoreError::NotFound {
        kind: "knowledge check",
        id: id.to_string(),
    }
}

#[async_trait]
impl KnowledgeCheckStore for InMemoryKnowledgeCheckStore {
    async fn create(&self, mut check: NewKnowledgeCheck) -> StoreResult<KnowledgeCheck> {
        check.validate()?;

        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let now = Utc::now();
        let created = KnowledgeCheck {
            id: inner.next_id,
            note_id: check.note_id,
            line_number_start: check.line_number_start,
            line_number_end: check.line_number_end,
            state: KnowledgeCheckState::Pending,
            user_score: None,
            user_score_explanation: None,
            topic_summary: check.topic_summary,
            created_at: now,
            updated_at: now,
        };
        inner.by_id.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<KnowledgeCheck> {
        self.inner
            .read()
            .await
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn get_all(&self) -> StoreResult<Vec<KnowledgeCheck>> {
        Ok(self.inner.read().await.by_id.values().cloned().collect())
    }

    async fn get_by_date_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<KnowledgeCheck>> {
        Ok(self
            .inner
            .read()
            .await
            .by_id
            .values()
            .filter(|check| start.map_or(true, |start| check.created_at >= start))
            .filter(|check| end.map_or(true, |end| check.created_at <= end))
            .cloned()
            .collect())
    }

    async fn update(&self, id: i64, update: KnowledgeCheckUpdate) -> StoreResult<KnowledgeCheck> {
        let mut inner = self.inner.write().await;
        let check = inner.by_id.get_mut(&id).ok_or_else(|| not_found(id))?;

        if check.state == KnowledgeCheckState::Completed {
            return Err(StoreError::Invalid {
                kind: "knowledge check",
                message: format!("{} is already completed and immutable", id),
            });
        }
        update.validate()?;

        if let Some(state) = update.state {
            check.state = state;
        }
        if let Some(score) = update.user_score {
            check.user_score = Some(score);
        }
        if let Some(explanation) = update.user_score_explanation {
            check.user_score_explanation = Some(explanation);
        }
        if let Some(summary) = update.topic_summary {
            check.topic_summary = summary.trim().to_string();
        }
        check.updated_at = Utc::now();
        Ok(check.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_check() -> NewKnowledgeCheck {
        NewKnowledgeCheck {
            note_id: 1,
            line_number_start: 3,
            line_number_end: 9,
            topic_summary: "  B-tree indexes ".into(),
        }
    }

    #[tokio::test]
    async fn test_create_validates_and_trims() {
        let store = InMemoryKnowledgeCheckStore::new();
        let check = store.create(new_check()).await.unwrap();
        assert_eq!(check.state, KnowledgeCheckState::Pending);
        assert_eq!(check.topic_summary, "B-tree indexes");

        let mut reversed = new_check();
        reversed.line_number_start = 10;
        assert!(matches!(
            store.create(reversed).await,
            Err(StoreError::Invalid { .. })
        ));
    }

    #[tokio::test]
    async fn test_completed_checks_are_immutable() {
        let store = InMemoryKnowledgeCheckStore::new();
        let check = store.create(new_check()).await.unwrap();

        let done = store
            .update(
                check.id,
                KnowledgeCheckUpdate {
                    state: Some(KnowledgeCheckState::Completed),
                    user_score: Some(8),
                    user_score_explanation: Some("solid recall".into()),
                    topic_summary: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(done.user_score, Some(8));

        let err = store
            .update(
                check.id,
                KnowledgeCheckUpdate {
                    user_score: Some(9),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already completed"));
    }

    #[tokio::test]
    async fn test_update_rejects_out_of_range_score() {
        let store = InMemoryKnowledgeCheckStore::new();
        let check = store.create(new_check()).await.unwrap();
        let update = KnowledgeCheckUpdate {
            user_score: Some(11),
            ..Default::default()
        };
        assert!(store.update(check.id, update).await.is_err());
        assert!(store
            .update(check.id, KnowledgeCheckUpdate::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_date_range() {
        let store = InMemoryKnowledgeCheckStore::new();
        store.create(new_check()).await.unwrap();
        let now = Utc::now();

        let all = store
            .get_by_date_range(Some(now - Duration::hours(1)), None)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);

        let none = store
            .get_by_date_range(None, Some(now - Duration::hours(1)))
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
