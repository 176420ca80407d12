use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flashcards::errors::ServiceError;
use serde_json::json;
use thiserror::Error;

pub const ENV_PREFIX: &str = "FLASHCARDS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Invalid server address {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// The environment variable that sets a configuration field.
///
/// Serde reports missing fields without their section, so the provider's own
/// required fields are mapped back under `provider`.
pub fn to_env_var(field: &str) -> String {
    let path = match field {
        "provider" | "type" => "provider.type",
        "api_key" => "provider.api_key",
        other => other,
    };
    format!("{}_{}", ENV_PREFIX, path.replace('.', "__").to_uppercase())
}

/// A service failure rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ServiceError::Validation(_) | ServiceError::Conversation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
            "processing failed".to_string()
        } else {
            tracing::debug!(error = %self.0, "rejected request");
            self.0.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
