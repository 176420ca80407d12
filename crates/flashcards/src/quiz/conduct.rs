use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::records::CHUNK_SEPARATOR;
use super::{chat_history, clean_topics, history_entries, ConductOutcome, QuizService};
use crate::decision::DecisionSet;
use crate::errors::{ServiceError, ServiceResult};
use crate::models::message::Message;
use crate::models::quiz::QuizEvaluation;
use crate::models::tool::Tool;

const CONTINUE_QUIZ: &str = "continue_quiz";

#[derive(Debug, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
enum ConductDecision {
    ContinueQuiz {
        message: String,
    },
    EvaluateAnswer {
        is_correct: bool,
        feedback: String,
        #[serde(default)]
        correct_answer: Option<String>,
        #[serde(default)]
        encouragement: Option<String>,
    },
}

impl From<ConductDecision> for ConductOutcome {
    fn from(decision: ConductDecision) -> Self {
        match decision {
            ConductDecision::ContinueQuiz { message } => ConductOutcome::Continue { message },
            ConductDecision::EvaluateAnswer {
                is_correct,
                feedback,
                correct_answer,
                encouragement,
            } => ConductOutcome::Evaluate {
                message: feedback.clone(),
                evaluation: QuizEvaluation {
                    correct: is_correct,
                    feedback,
                    correct_answer: correct_answer.filter(|answer| !answer.trim().is_empty()),
                    encouragement: encouragement.filter(|text| !text.trim().is_empty()),
                },
            },
        }
    }
}

fn conduct_set() -> DecisionSet {
    DecisionSet::new(vec![
        Tool::new(
            CONTINUE_QUIZ,
            "Continue the quiz conversation, provide clarifications, or steer user back to answering the question",
            json!({
                "type": "object",
                "required": ["message"],
                "properties": {
                    "message": {"type": "string", "description": "The message to continue the conversation with the user"}
                }
            }),
        ),
        Tool::new(
            "evaluate_answer",
            "Evaluate the user's answer and provide detailed feedback",
            json!({
                "type": "object",
                "required": ["is_correct", "feedback"],
                "properties": {
                    "is_correct": {"type": "boolean", "description": "Whether the user's answer is correct"},
                    "feedback": {"type": "string", "description": "Detailed feedback explaining the correctness of the answer"},
                    "correct_answer": {"type": "string", "description": "The correct answer if the user's answer was incorrect"},
                    "encouragement": {"type": "string", "description": "Optional encouragement or additional context"}
                }
            }),
        ),
    ])
}

/// Inputs of one conduct round, shared by both quiz generations
struct Round<'a> {
    source: &'a str,
    materials: Vec<&'a str>,
    topics: &'a [String],
    asked_questions: &'a [String],
    history: Vec<Message>,
}

impl QuizService {
    async fn conduct_round(&self, round: Round<'_>) -> ServiceResult<ConductOutcome> {
        let system = self.render(
            "quiz_conduct.md",
            &json!({"source": round.source, "asked_questions": round.asked_questions}),
        )?;
        let prompt = self.render(
            "quiz_conduct_round.md",
            &json!({
                "topics": round.topics,
                "materials": round.materials,
                "history": history_entries(&round.history),
            }),
        )?;

        // an opening round can only ask a question
        let pinned = round.history.is_empty().then_some(CONTINUE_QUIZ);

        let mut messages = round.history;
        messages.push(Message::user().with_text(prompt));

        let decision: ConductDecision = self
            .decisions
            .decide(&system, &messages, &conduct_set(), pinned)
            .await?;
        Ok(decision.into())
    }

    /// One round of a note-based quiz: ask a question, clarify, or judge an answer
    pub async fn conduct_quiz(
        &self,
        note_ids: &[i64],
        topics: &[String],
        messages: &[Message],
    ) -> ServiceResult<ConductOutcome> {
        info!(notes = note_ids.len(), ?topics, messages = messages.len(), "conducting note quiz");
        let topics = clean_topics(topics);
        if topics.is_empty() {
            return Err(ServiceError::Validation("at least one topic is required".to_string()));
        }
        let history = chat_history(messages)?;
        let notes = self.notes_by_ids(note_ids).await?;

        self.conduct_round(Round {
            source: "notes",
            materials: notes.iter().map(|note| note.content.as_str()).collect(),
            topics: &topics,
            asked_questions: &[],
            history,
        })
        .await
    }

    /// One round of a persisted quiz.
    ///
    /// Only the current question's messages are passed in; the study material and
    /// the questions already asked come from the stored quiz. A question opening a
    /// round is appended to the quiz's asked questions.
    pub async fn conduct_quiz_v2(&self, quiz_id: i64, messages: &[Message]) -> ServiceResult<ConductOutcome> {
        info!(quiz_id, messages = messages.len(), "conducting quiz");
        let history = chat_history(messages)?;
        let quiz = self.quizzes.get_by_id(quiz_id).await?;

        let materials: Vec<&str> = quiz
            .llm_context
            .split(CHUNK_SEPARATOR)
            .map(str::trim)
            .filter(|chunk| !chunk.is_empty())
            .collect();
        if materials.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "no study material stored for quiz {}",
                quiz_id
            )));
        }

        let opening = history.is_empty();
        let outcome = self
            .conduct_round(Round {
                source: "content",
                materials,
                topics: &quiz.config.topics,
                asked_questions: &quiz.asked_questions,
                history,
            })
            .await?;

        if let (true, ConductOutcome::Continue { message }) = (opening, &outcome) {
            // Read-then-write without a lock: two concurrent opening rounds on the
            // same quiz can lose one of the appends.
            let mut asked = quiz.asked_questions.clone();
            asked.push(message.clone());
            self.quizzes.update(quiz_id, asked).await?;
            debug!(quiz_id, "recorded asked question");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::QuizConfig;
    use crate::models::tool::ToolChoice;
    use crate::quiz::test_support::fixture;
    use crate::store::QuizStore;

    fn ask(question: &str) -> Message {
        Message::assistant().with_tool_call("call_1", CONTINUE_QUIZ, json!({"message": question}))
    }

    fn evaluate(correct: bool) -> Message {
        Message::assistant().with_tool_call(
            "call_1",
            "evaluate_answer",
            json!({
                "is_correct": correct,
                "feedback": "Redis evicts keys with LRU.",
                "correct_answer": "LRU eviction",
                "encouragement": ""
            }),
        )
    }

    fn topics() -> Vec<String> {
        vec!["caching".to_string()]
    }

    #[tokio::test]
    async fn test_first_round_is_pinned_to_a_question() {
        let f = fixture(vec![ask("What does a cache eviction policy decide?")]);
        let outcome = f.service.conduct_quiz(&[1], &topics(), &[]).await.unwrap();
        assert_eq!(outcome.message(), "What does a cache eviction policy decide?");

        let requests = f.provider.requests().await;
        assert_eq!(requests[0].tool_choice, ToolChoice::Tool(CONTINUE_QUIZ.to_string()));
        assert_eq!(requests[0].messages.len(), 1);
        assert!(requests[0].messages[0].content.contains("Redis is a popular cache"));
    }

    #[tokio::test]
    async fn test_first_round_evaluation_is_malformed() {
        let f = fixture(vec![evaluate(true)]);
        let err = f.service.conduct_quiz(&[1], &topics(), &[]).await.unwrap_err();
        assert!(matches!(err, ServiceError::MalformedDecision(_)));
    }

    #[tokio::test]
    async fn test_answer_is_evaluated() {
        let f = fixture(vec![evaluate(false)]);
        let history = vec![
            Message::assistant().with_text("How does Redis pick keys to evict?"),
            Message::user().with_text("randomly"),
        ];
        let outcome = f.service.conduct_quiz(&[1], &topics(), &history).await.unwrap();

        match outcome {
            ConductOutcome::Evaluate { message, evaluation } => {
                assert_eq!(message, "Redis evicts keys with LRU.");
                assert!(!evaluation.correct);
                assert_eq!(evaluation.correct_answer.as_deref(), Some("LRU eviction"));
                assert_eq!(evaluation.encouragement, None);
            }
            other => panic!("expected an evaluation, got {:?}", other),
        }

        let requests = f.provider.requests().await;
        assert_eq!(requests[0].tool_choice, ToolChoice::Required);
        // history plus the round prompt
        assert_eq!(requests[0].messages.len(), 3);
        assert!(requests[0].messages[2].content.contains("user: randomly"));
    }

    #[tokio::test]
    async fn test_requires_topics_and_known_notes() {
        let f = fixture(vec![]);
        let err = f.service.conduct_quiz(&[1], &[], &[]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let err = f.service.conduct_quiz(&[5], &topics(), &[]).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_v2_opening_question_is_recorded() {
        let f = fixture(vec![ask("Why cache at all?"), ask("Name one eviction policy.")]);
        let quiz = f
            .quizzes
            .create(
                QuizConfig {
                    question_count: 2,
                    topics: topics(),
                },
                format!("Caching keeps hot data in memory.{}Redis evicts with LRU.", CHUNK_SEPARATOR),
            )
            .await
            .unwrap();

        f.service.conduct_quiz_v2(quiz.id, &[]).await.unwrap();
        f.service.conduct_quiz_v2(quiz.id, &[]).await.unwrap();

        let stored = f.quizzes.get_by_id(quiz.id).await.unwrap();
        assert_eq!(
            stored.asked_questions,
            vec!["Why cache at all?", "Name one eviction policy."]
        );

        let requests = f.provider.requests().await;
        assert!(requests[1].system.contains("Why cache at all?"));
        let prompt = &requests[1].messages[0].content;
        assert!(prompt.contains("1. Caching keeps hot data in memory."));
        assert!(prompt.contains("2. Redis evicts with LRU."));
    }

    #[tokio::test]
    async fn test_v2_follow_up_does_not_record() {
        let f = fixture(vec![ask("Try again: what is a cache hit?")]);
        let quiz = f
            .quizzes
            .create(
                QuizConfig {
                    question_count: 1,
                    topics: topics(),
                },
                "Caching keeps hot data in memory.".to_string(),
            )
            .await
            .unwrap();

        let history = vec![
            Message::assistant().with_text("What is a cache hit?"),
            Message::user().with_text("what do you mean?"),
        ];
        let outcome = f.service.conduct_quiz_v2(quiz.id, &history).await.unwrap();
        assert!(matches!(outcome, ConductOutcome::Continue { .. }));

        let stored = f.quizzes.get_by_id(quiz.id).await.unwrap();
        assert!(stored.asked_questions.is_empty());
    }

    #[tokio::test]
    async fn test_v2_unknown_quiz() {
        let f = fixture(vec![]);
        let err = f.service.conduct_quiz_v2(77, &[]).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
