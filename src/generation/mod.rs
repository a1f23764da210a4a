// src/generation/mod.rs

//! Author-side generation flow: ingest a document, ask the model for
//! questions, validate what comes back, persist it.

pub mod ingestion;
pub mod orchestrator;
pub mod parser;
pub mod pipeline;

use reqwest::Response;
use serde::Deserialize;

pub use ingestion::{DocumentIngestion, IngestionReceipt, RagIngestionClient};
pub use orchestrator::{QuestionGenerator, RagQuestionGenerator};
pub use parser::{ParseError, parse_questions};
pub use pipeline::{GenerationPipeline, GenerationRequest, PipelineError, PipelineStage};

/// A source document as received from the author.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Failure talking to the indexing / generation service.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service responded with status {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Maps a non-2xx response to `CollaboratorError::Status`, using the
/// service's `{"error": ...}` body when it has one.
async fn ensure_success(response: Response) -> Result<Response, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        });

    Err(CollaboratorError::Status {
        status: status.as_u16(),
        message,
    })
}
