use serde::Deserialize;
use serde_json::json;
use std::collections::{BTreeSet, HashSet};
use tracing::{info, warn};

use super::{clean_topics, QuizService};
use crate::decision::DecisionSet;
use crate::errors::{ServiceError, ServiceResult};
use crate::models::message::Message;
use crate::models::note::{Note, RankedNote};
use crate::models::tool::Tool;

const RANK_NOTES: &str = "rank_notes";

#[derive(Debug, Deserialize)]
struct NoteRanking {
    note_id: i64,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
enum RankDecision {
    RankNotes { rankings: Vec<NoteRanking> },
}

fn rank_set() -> DecisionSet {
    DecisionSet::new(vec![Tool::new(
        RANK_NOTES,
        "Rank the provided notes by relevance to the given topics",
        json!({
            "type": "object",
            "required": ["rankings"],
            "properties": {
                "rankings": {
                    "type": "array",
                    "description": "Array of note rankings with relevance scores",
                    "items": {
                        "type": "object",
                        "required": ["note_id", "score"],
                        "properties": {
                            "note_id": {"type": "integer", "description": "The ID of the note being ranked"},
                            "score": {
                                "type": "number",
                                "description": "Relevance score from 0.0 to 1.0, where 1.0 is most relevant",
                                "minimum": 0.0,
                                "maximum": 1.0
                            }
                        }
                    }
                }
            }
        }),
    )])
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Keep one ranking per candidate, require every candidate to be ranked, and
/// order by score, highest first.
fn collect_rankings(candidates: &[Note], rankings: Vec<NoteRanking>) -> ServiceResult<Vec<RankedNote>> {
    let candidate_ids: BTreeSet<i64> = candidates.iter().map(|note| note.id).collect();
    let mut seen = HashSet::new();
    let mut ranked = Vec::with_capacity(candidates.len());

    for ranking in rankings {
        if !candidate_ids.contains(&ranking.note_id) {
            warn!(note_id = ranking.note_id, "dropping ranking for a note that was not a candidate");
            continue;
        }
        if !seen.insert(ranking.note_id) {
            warn!(note_id = ranking.note_id, "dropping duplicate ranking");
            continue;
        }
        ranked.push(RankedNote {
            note_id: ranking.note_id,
            score: clamp_score(ranking.score),
        });
    }

    let missing: Vec<i64> = candidate_ids
        .iter()
        .filter(|id| !seen.contains(*id))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(ServiceError::NotFound(format!(
            "no ranking returned for note ids: {:?}",
            missing
        )));
    }

    // tie order is left to the sort
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(ranked)
}

impl QuizService {
    /// Score `candidates` against `topics` with a single forced `rank_notes` call
    pub async fn rank(&self, candidates: &[Note], topics: &[String]) -> ServiceResult<Vec<RankedNote>> {
        let topics = clean_topics(topics);
        if candidates.is_empty() {
            return Err(ServiceError::Validation("at least one note is required".to_string()));
        }
        if topics.is_empty() {
            return Err(ServiceError::Validation("at least one topic is required".to_string()));
        }

        let system = self.render("quiz_rank_system.md", &json!({}))?;
        let prompt = self.render("quiz_rank.md", &json!({"topics": topics, "notes": candidates}))?;
        let messages = [Message::user().with_text(prompt)];

        let RankDecision::RankNotes { rankings } = self
            .decisions
            .decide(&system, &messages, &rank_set(), Some(RANK_NOTES))
            .await?;

        let ranked = collect_rankings(candidates, rankings)?;
        info!(ranked = ranked.len(), ?topics, "ranked notes");
        Ok(ranked)
    }

    /// Rank stored notes by id; every id has to exist
    pub async fn rank_notes(&self, note_ids: &[i64], topics: &[String]) -> ServiceResult<Vec<RankedNote>> {
        info!(notes = note_ids.len(), ?topics, "ranking notes");
        if clean_topics(topics).is_empty() {
            return Err(ServiceError::Validation("at least one topic is required".to_string()));
        }
        let candidates = self.notes_by_ids(note_ids).await?;
        self.rank(&candidates, topics).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tool::ToolChoice;
    use crate::quiz::test_support::fixture;

    fn rank_response(rankings: serde_json::Value) -> Message {
        Message::assistant().with_tool_call("call_1", RANK_NOTES, json!({"rankings": rankings}))
    }

    fn topics(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[tokio::test]
    async fn test_sorted_by_score_and_clamped() {
        let f = fixture(vec![rank_response(json!([
            {"note_id": 1, "score": 0.4},
            {"note_id": 2, "score": 1.7},
            {"note_id": 3, "score": -0.2}
        ]))]);

        let ranked = f
            .service
            .rank_notes(&[1, 2, 3], &topics(&["caching"]))
            .await
            .unwrap();

        assert_eq!(
            ranked,
            vec![
                RankedNote { note_id: 2, score: 1.0 },
                RankedNote { note_id: 1, score: 0.4 },
                RankedNote { note_id: 3, score: 0.0 },
            ]
        );

        let requests = f.provider.requests().await;
        assert_eq!(requests[0].tool_choice, ToolChoice::Tool(RANK_NOTES.to_string()));
        let prompt = &requests[0].messages[0].content;
        assert!(prompt.contains("these topics: caching"));
        assert!(prompt.contains("Note ID 2:"));
        assert!(prompt.contains("Load balancers spread traffic"));
    }

    #[tokio::test]
    async fn test_missing_ranking_names_the_note() {
        let f = fixture(vec![rank_response(json!([{"note_id": 1, "score": 0.9}]))]);
        let err = f
            .service
            .rank_notes(&[1, 2], &topics(&["caching"]))
            .await
            .unwrap_err();
        match err {
            ServiceError::NotFound(message) => assert!(message.ends_with("[2]"), "{}", message),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_and_duplicate_rankings_are_dropped() {
        let f = fixture(vec![rank_response(json!([
            {"note_id": 2, "score": 0.2},
            {"note_id": 42, "score": 0.99},
            {"note_id": 2, "score": 0.8}
        ]))]);
        let ranked = f.service.rank_notes(&[2], &topics(&["indexes"])).await.unwrap();
        assert_eq!(ranked, vec![RankedNote { note_id: 2, score: 0.2 }]);
    }

    #[tokio::test]
    async fn test_rejects_bad_input_before_calling_provider() {
        let f = fixture(vec![]);
        let err = f.service.rank_notes(&[1], &topics(&[" "])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = f.service.rank_notes(&[1, 99], &topics(&["caching"])).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        assert!(f.provider.requests().await.is_empty());
    }

    #[test]
    fn test_ties_keep_score_order() {
        let candidates = vec![Note::new(1, "a"), Note::new(2, "b"), Note::new(3, "c")];
        let ranked = collect_rankings(
            &candidates,
            vec![
                NoteRanking { note_id: 1, score: 0.5 },
                NoteRanking { note_id: 2, score: 0.9 },
                NoteRanking { note_id: 3, score: 0.5 },
            ],
        )
        .unwrap();
        assert_eq!(ranked[0].note_id, 2);
        assert!(ranked.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }
}
