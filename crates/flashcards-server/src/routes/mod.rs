pub mod agent;
pub mod quiz;
pub mod quizzes;

use axum::{
    body::Body,
    http::header,
    response::{IntoResponse, Response},
    Router,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::convert::Infallible;

use crate::state::AppState;

/// A chunked text response, flushed as each chunk arrives
pub struct StreamResponse<S> {
    chunks: S,
}

impl<S> StreamResponse<S>
where
    S: Stream<Item = String> + Send + 'static,
{
    pub fn new(chunks: S) -> Self {
        Self { chunks }
    }
}

impl<S> IntoResponse for StreamResponse<S>
where
    S: Stream<Item = String> + Send + 'static,
{
    fn into_response(self) -> Response {
        let body = Body::from_stream(
            self.chunks
                .map(|chunk| Ok::<_, Infallible>(Bytes::from(chunk))),
        );
        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::CONNECTION, "keep-alive"),
            ],
            body,
        )
            .into_response()
    }
}

pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(agent::routes(state.clone()))
        .merge(quiz::routes(state.clone()))
        .merge(quizzes::routes(state))
}
