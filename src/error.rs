use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

/// Longest model output fragment ever carried inside an error.
pub const EXCERPT_LIMIT: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid generation request: {0}")]
    InvalidRequestShape(String),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Text extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Generation backend error: {0}")]
    GenerationBackend(String),

    #[error("Malformed generation response: {reason} (excerpt: {excerpt:?})")]
    MalformedGenerationResponse { reason: String, excerpt: String },

    #[error("Invalid question shape: {0}")]
    InvalidQuestionShape(String),

    #[error("Generation produced no usable questions")]
    EmptyGenerationResult,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
}

impl Error {
    pub fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        Error::MalformedGenerationResponse {
            reason: reason.into(),
            excerpt: excerpt(raw),
        }
    }

    /// Stable machine-readable kind sent to clients next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidRequestShape(_) => "invalid_request",
            Error::SourceNotFound(_) => "source_not_found",
            Error::ExtractionFailed(_) => "extraction_failed",
            Error::GenerationBackend(_) => "generation_backend_error",
            Error::MalformedGenerationResponse { .. } => "malformed_generation_response",
            Error::InvalidQuestionShape(_) => "invalid_question_shape",
            Error::EmptyGenerationResult => "empty_generation_result",
            Error::BadRequest(_)
            | Error::Validation(_)
            | Error::Json(_)
            | Error::Multipart(_) => "bad_request",
            Error::Unauthorized(_) => "unauthorized",
            Error::NotFound(_) => "not_found",
            _ => "internal_error",
        }
    }
}

/// First `EXCERPT_LIMIT` characters of `raw`, cut on a char boundary.
pub fn excerpt(raw: &str) -> String {
    match raw.char_indices().nth(EXCERPT_LIMIT) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let code = self.code();
        let (status, error_message) = match self {
            Error::InvalidRequestShape(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::SourceNotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::ExtractionFailed(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Error::GenerationBackend(_) => (
                StatusCode::BAD_GATEWAY,
                "The question generation service is unavailable".to_string(),
            ),
            Error::MalformedGenerationResponse { reason, .. } => (
                StatusCode::BAD_GATEWAY,
                format!("The generation service returned an unreadable response: {}", reason),
            ),
            Error::InvalidQuestionShape(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("The generation service returned an invalid question: {}", msg),
            ),
            Error::EmptyGenerationResult => (
                StatusCode::BAD_GATEWAY,
                "The generation service produced no usable questions".to_string(),
            ),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Multipart(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            other => {
                tracing::error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message, "code": code }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_is_bounded_on_char_boundary() {
        let raw = "ż".repeat(EXCERPT_LIMIT + 50);
        let cut = excerpt(&raw);
        assert_eq!(cut.chars().count(), EXCERPT_LIMIT + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn malformed_keeps_only_excerpt() {
        let raw = "x".repeat(10_000);
        match Error::malformed("not json", &raw) {
            Error::MalformedGenerationResponse { excerpt, .. } => {
                assert!(excerpt.len() <= EXCERPT_LIMIT + 3)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn taxonomy_maps_to_distinct_statuses() {
        let cases = [
            (Error::InvalidRequestShape("x".into()), StatusCode::BAD_REQUEST),
            (Error::SourceNotFound("x".into()), StatusCode::NOT_FOUND),
            (Error::ExtractionFailed("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (Error::GenerationBackend("x".into()), StatusCode::BAD_GATEWAY),
            (Error::EmptyGenerationResult, StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
