use crate::error::ApiError;
use crate::routes::StreamResponse;
use crate::state::AppState;
use axum::{extract::State, routing::post, Json, Router};
use flashcards::{
    models::message::Message,
    models::note::RankedNote,
    models::quiz::{NoteQuizConfig, QuizConfig},
    quiz::{ConductOutcome, ConfigureOutcome, GeneratedQuestion},
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    note_ids: Vec<i64>,
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct ConfigureRequest {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct RankRequest {
    note_ids: Vec<i64>,
    topics: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RankResponse {
    rankings: Vec<RankedNote>,
}

#[derive(Debug, Deserialize)]
struct ConductRequest {
    note_ids: Vec<i64>,
    topics: Vec<String>,
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct ConductV2Request {
    quiz_id: i64,
    #[serde(default)]
    messages: Vec<Message>,
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GeneratedQuestion>, ApiError> {
    let question = state
        .quiz
        .generate_question(&request.note_ids, &request.messages)
        .await?;
    Ok(Json(question))
}

async fn generate_stream(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> StreamResponse<UnboundedReceiverStream<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let quiz = state.quiz.clone();

    tokio::spawn(async move {
        let result = quiz
            .generate_question_stream(&request.note_ids, &request.messages, &mut |token: &str| {
                let _ = tx.send(token.to_string());
            })
            .await;

        // headers are already out, so failures are reported in the body
        if let Err(err) = result {
            let message = if err.is_client_error() {
                err.to_string()
            } else {
                tracing::error!(error = %err, "streaming quiz generation failed");
                "processing failed".to_string()
            };
            let _ = tx.send(format!("Error: {}\n", message));
        }
    });

    StreamResponse::new(UnboundedReceiverStream::new(rx))
}

async fn configure(
    State(state): State<AppState>,
    Json(request): Json<ConfigureRequest>,
) -> Result<Json<ConfigureOutcome<NoteQuizConfig>>, ApiError> {
    Ok(Json(state.quiz.configure_quiz(&request.messages).await?))
}

async fn rank(
    State(state): State<AppState>,
    Json(request): Json<RankRequest>,
) -> Result<Json<RankResponse>, ApiError> {
    let rankings = state
        .quiz
        .rank_notes(&request.note_ids, &request.topics)
        .await?;
    Ok(Json(RankResponse { rankings }))
}

async fn conduct(
    State(state): State<AppState>,
    Json(request): Json<ConductRequest>,
) -> Result<Json<ConductOutcome>, ApiError> {
    let outcome = state
        .quiz
        .conduct_quiz(&request.note_ids, &request.topics, &request.messages)
        .await?;
    Ok(Json(outcome))
}

async fn configure_v2(
    State(state): State<AppState>,
    Json(request): Json<ConfigureRequest>,
) -> Result<Json<ConfigureOutcome<QuizConfig>>, ApiError> {
    Ok(Json(state.quiz.configure_quiz_v2(&request.messages).await?))
}

async fn conduct_v2(
    State(state): State<AppState>,
    Json(request): Json<ConductV2Request>,
) -> Result<Json<ConductOutcome>, ApiError> {
    let outcome = state
        .quiz
        .conduct_quiz_v2(request.quiz_id, &request.messages)
        .await?;
    Ok(Json(outcome))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/quiz/generate", post(generate))
        .route("/quiz/generate/stream", post(generate_stream))
        .route("/quiz/configure", post(configure))
        .route("/quiz/rank", post(rank))
        .route("/quiz/conduct", post(conduct))
        .route("/quiz/v2/configure", post(configure_v2))
        .route("/quiz/v2/conduct", post(conduct_v2))
        .with_state(state)
}
