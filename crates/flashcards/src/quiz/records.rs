use tracing::info;

use super::configure::MAX_QUIZ_QUESTIONS;
use super::QuizService;
use crate::errors::{ServiceError, ServiceResult};
use crate::models::quiz::{Quiz, QuizConfig};

/// Joins the retrieved chunks in a stored quiz context
pub const CHUNK_SEPARATOR: &str = "\n\n=== CHUNK SEPARATOR ===\n\n";

/// Chunks fetched beyond one per question
const EXTRA_CHUNKS: usize = 5;

fn validate_config(mut config: QuizConfig) -> ServiceResult<QuizConfig> {
    if config.topics.is_empty() {
        return Err(ServiceError::Validation("at least one topic is required".to_string()));
    }
    if config.question_count == 0 {
        return Err(ServiceError::Validation(
            "question count must be greater than 0".to_string(),
        ));
    }
    if config.question_count > MAX_QUIZ_QUESTIONS {
        return Err(ServiceError::Validation(format!(
            "question count cannot exceed {}",
            MAX_QUIZ_QUESTIONS
        )));
    }

    for (index, topic) in config.topics.iter_mut().enumerate() {
        let trimmed = topic.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::Validation(format!(
                "topic {} cannot be empty",
                index + 1
            )));
        }
        *topic = trimmed.to_string();
    }
    Ok(config)
}

fn validate_id(id: i64) -> ServiceResult<()> {
    if id <= 0 {
        return Err(ServiceError::Validation(format!("invalid quiz id: {}", id)));
    }
    Ok(())
}

impl QuizService {
    /// Persist a quiz together with the study material retrieved for its topics
    pub async fn create_quiz(&self, config: QuizConfig) -> ServiceResult<Quiz> {
        let config = validate_config(config)?;
        let limit = config.question_count as usize + EXTRA_CHUNKS;
        info!(topics = ?config.topics, limit, "creating quiz");

        let chunks = self.topics.query_topic_chunks(&config.topics, limit).await?;
        if chunks.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "no study material found for topics: {}",
                config.topics.join(", ")
            )));
        }

        let llm_context = chunks.join(CHUNK_SEPARATOR);
        let quiz = self.quizzes.create(config, llm_context).await?;
        info!(quiz_id = quiz.id, chunks = chunks.len(), "created quiz");
        Ok(quiz)
    }

    pub async fn get_quiz(&self, id: i64) -> ServiceResult<Quiz> {
        validate_id(id)?;
        Ok(self.quizzes.get_by_id(id).await?)
    }

    pub async fn list_quizzes(&self) -> ServiceResult<Vec<Quiz>> {
        Ok(self.quizzes.get_all().await?)
    }

    /// Replace the questions recorded as asked for a quiz
    pub async fn update_quiz(&self, id: i64, asked_questions: Vec<String>) -> ServiceResult<Quiz> {
        validate_id(id)?;
        let quiz = self.quizzes.update(id, asked_questions).await?;
        info!(quiz_id = id, asked = quiz.asked_questions.len(), "updated quiz");
        Ok(quiz)
    }

    pub async fn delete_quiz(&self, id: i64) -> ServiceResult<()> {
        validate_id(id)?;
        self.quizzes.delete(id).await?;
        info!(quiz_id = id, "deleted quiz");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::test_support::fixture;

    fn config(question_count: u32, topics: &[&str]) -> QuizConfig {
        QuizConfig {
            question_count,
            topics: topics.iter().map(|topic| topic.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_quiz_stores_context() {
        let f = fixture(vec![]);
        let quiz = f
            .service
            .create_quiz(config(3, &["  caching ", "eviction"]))
            .await
            .unwrap();

        assert_eq!(quiz.config.topics, vec!["caching", "eviction"]);
        assert!(quiz.asked_questions.is_empty());
        // one paragraph per topic
        assert_eq!(quiz.llm_context.matches(CHUNK_SEPARATOR).count(), 1);
        assert!(quiz.llm_context.contains("Section: note 1"));

        // the context never leaves the server
        let json = serde_json::to_value(&quiz).unwrap();
        assert!(json.get("llm_context").is_none());
        assert!(f.provider.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_quiz_validation() {
        let f = fixture(vec![]);
        for bad in [config(0, &["caching"]), config(6, &["caching"]), config(2, &[]), config(2, &["caching", " "])] {
            let err = f.service.create_quiz(bad).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "{:?}", err);
        }

        let err = f.service.create_quiz(config(1, &["astronomy"])).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(f.service.list_quizzes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quiz_record_lifecycle() {
        let f = fixture(vec![]);
        let quiz = f.service.create_quiz(config(1, &["indexes"])).await.unwrap();

        let updated = f
            .service
            .update_quiz(quiz.id, vec!["What is an index?".to_string()])
            .await
            .unwrap();
        assert_eq!(updated.asked_questions, vec!["What is an index?"]);
        assert_eq!(f.service.get_quiz(quiz.id).await.unwrap(), updated);
        assert_eq!(f.service.list_quizzes().await.unwrap().len(), 1);

        f.service.delete_quiz(quiz.id).await.unwrap();
        let err = f.service.get_quiz(quiz.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = f.service.get_quiz(0).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
