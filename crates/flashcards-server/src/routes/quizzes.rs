use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use flashcards::models::quiz::{Quiz, QuizConfig};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct UpdateQuizRequest {
    asked_questions: Vec<String>,
}

async fn create_quiz(
    State(state): State<AppState>,
    Json(config): Json<QuizConfig>,
) -> Result<(StatusCode, Json<Quiz>), ApiError> {
    let quiz = state.quiz.create_quiz(config).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

async fn list_quizzes(State(state): State<AppState>) -> Result<Json<Vec<Quiz>>, ApiError> {
    Ok(Json(state.quiz.list_quizzes().await?))
}

async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Quiz>, ApiError> {
    Ok(Json(state.quiz.get_quiz(id).await?))
}

async fn update_quiz(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateQuizRequest>,
) -> Result<Json<Quiz>, ApiError> {
    Ok(Json(state.quiz.update_quiz(id, request.asked_questions).await?))
}

async fn delete_quiz(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.quiz.delete_quiz(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/quizzes", get(list_quizzes).post(create_quiz))
        .route(
            "/quizzes/:id",
            get(get_quiz).put(update_quiz).delete(delete_quiz),
        )
        .with_state(state)
}
