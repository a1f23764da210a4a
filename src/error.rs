// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::{
    generation::{PipelineError, PipelineStage},
    quiz::SessionError,
    repository::RepositoryError,
};

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., session already started)
    Conflict(String),

    // 422 Unprocessable Entity (generated content rejected)
    UnprocessableEntity(String),

    // 502 Bad Gateway (a collaborator failed)
    BadGateway(String),

    /// A failed generation run. The body names the failing stage.
    Pipeline {
        status: StatusCode,
        stage: PipelineStage,
        kind: &'static str,
        message: String,
    },

    /// Result write failed after scoring. The score is still reported.
    SubmissionFailed { score: u8, message: String },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::UnprocessableEntity(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": msg }))
            }
            AppError::BadGateway(msg) => {
                tracing::warn!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, json!({ "error": msg }))
            }
            AppError::Pipeline {
                status,
                stage,
                kind,
                message,
            } => (
                status,
                json!({ "error": message, "stage": stage, "kind": kind }),
            ),
            AppError::SubmissionFailed { score, message } => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": message, "score": score }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => AppError::NotFound(msg),
            RepositoryError::Database(e) => AppError::InternalServerError(e.to_string()),
            RepositoryError::Transport(e) => AppError::BadGateway(e.to_string()),
            RepositoryError::Rejected { status, message } => {
                AppError::BadGateway(format!("status {}: {}", status, message))
            }
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let stage = err.stage();
        let kind = err.kind();

        let (status, message) = match &err {
            PipelineError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            PipelineError::UploadFailed(_) | PipelineError::GenerationRequestFailed(_) => {
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            PipelineError::Rejected(_) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            PipelineError::PersistFailed(_) => {
                tracing::error!("Generation pipeline failed to persist: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to save the generated assessment".to_string(),
                )
            }
        };

        AppError::Pipeline {
            status,
            stage,
            kind,
            message,
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            SessionError::QuestionOutOfRange { .. } | SessionError::OptionOutOfRange { .. } => {
                AppError::BadRequest(err.to_string())
            }
            SessionError::SubmissionFailed { score, message } => {
                AppError::SubmissionFailed { score, message }
            }
            SessionError::Closed => AppError::NotFound("Quiz session not found".to_string()),
        }
    }
}
