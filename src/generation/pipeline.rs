// src/generation/pipeline.rs

use std::sync::Arc;

use serde::Serialize;
use validator::Validate;

use crate::{
    models::assessment::{Assessment, NewAssessment},
    repository::{AssessmentRepository, RepositoryError},
};

use super::{
    CollaboratorError, Document, DocumentIngestion, ParseError, QuestionGenerator,
    orchestrator::{MAX_QUESTIONS, MIN_QUESTIONS},
    parse_questions,
};

/// Topic used when the author leaves it blank.
pub const DEFAULT_TOPIC: &str = "AI Generated from PDF";

/// Same bound as manual authoring applies to heading and topic.
const MAX_TITLE_CHARS: usize = 200;

/// Input to one generation run.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub heading: String,
    pub topic: String,
    pub question_count: u32,
    pub document: Document,
}

/// The stage a pipeline run failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Validation,
    Upload,
    Generation,
    Parsing,
    Persistence,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("document upload failed: {0}")]
    UploadFailed(#[source] CollaboratorError),

    #[error("question generation request failed: {0}")]
    GenerationRequestFailed(#[source] CollaboratorError),

    #[error("generated content rejected: {0}")]
    Rejected(#[from] ParseError),

    #[error("failed to persist assessment: {0}")]
    PersistFailed(#[source] RepositoryError),
}

impl PipelineError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::InvalidRequest(_) => PipelineStage::Validation,
            PipelineError::UploadFailed(_) => PipelineStage::Upload,
            PipelineError::GenerationRequestFailed(_) => PipelineStage::Generation,
            PipelineError::Rejected(_) => PipelineStage::Parsing,
            PipelineError::PersistFailed(_) => PipelineStage::Persistence,
        }
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidRequest(_) => "InvalidRequest",
            PipelineError::UploadFailed(_) => "UploadFailed",
            PipelineError::GenerationRequestFailed(_) => "GenerationRequestFailed",
            PipelineError::Rejected(ParseError::NoStructuredPayload) => "NoStructuredPayload",
            PipelineError::Rejected(ParseError::MalformedPayload(_)) => "MalformedPayload",
            PipelineError::Rejected(ParseError::EmptyResult) => "EmptyResult",
            PipelineError::Rejected(ParseError::InvalidQuestion { .. }) => "InvalidQuestion",
            PipelineError::PersistFailed(_) => "PersistFailed",
        }
    }
}

/// Runs document -> questions -> assessment, one stage at a time.
///
/// Each stage gates the next and none is retried. A failure after the upload
/// leaves the document indexed by the external service; nothing is rolled back.
pub struct GenerationPipeline {
    ingestion: Arc<dyn DocumentIngestion>,
    generator: Arc<dyn QuestionGenerator>,
    repository: Arc<dyn AssessmentRepository>,
    max_document_bytes: usize,
}

impl GenerationPipeline {
    pub fn new(
        ingestion: Arc<dyn DocumentIngestion>,
        generator: Arc<dyn QuestionGenerator>,
        repository: Arc<dyn AssessmentRepository>,
        max_document_bytes: usize,
    ) -> Self {
        Self {
            ingestion,
            generator,
            repository,
            max_document_bytes,
        }
    }

    #[tracing::instrument(
        name = "generation_pipeline",
        skip_all,
        fields(heading = %request.heading, question_count = request.question_count)
    )]
    pub async fn run(&self, request: GenerationRequest) -> Result<Assessment, PipelineError> {
        let request = self.validate(request)?;

        tracing::info!(
            file_name = %request.document.file_name,
            size = request.document.bytes.len(),
            "Uploading document"
        );
        self.ingestion
            .ingest(&request.document)
            .await
            .map_err(|e| {
                tracing::warn!("Document upload failed: {}", e);
                PipelineError::UploadFailed(e)
            })?;

        tracing::info!("Requesting generated questions");
        let raw = self
            .generator
            .generate(request.question_count)
            .await
            .map_err(|e| {
                tracing::warn!("Generation request failed: {}", e);
                PipelineError::GenerationRequestFailed(e)
            })?;

        let questions = parse_questions(&raw).map_err(|e| {
            tracing::warn!(response_len = raw.len(), "Generated content rejected: {}", e);
            PipelineError::Rejected(e)
        })?;

        if questions.len() != request.question_count as usize {
            tracing::info!(
                requested = request.question_count,
                received = questions.len(),
                "Model returned a different number of questions than requested"
            );
        }

        let assessment = NewAssessment {
            heading: request.heading,
            topic: request.topic,
            questions,
        };
        // Same limits as manual authoring.
        assessment.validate().map_err(|e| {
            tracing::warn!("Generated assessment exceeds authoring limits: {}", e);
            PipelineError::InvalidRequest(format!(
                "Generated assessment exceeds authoring limits: {}",
                e
            ))
        })?;

        tracing::info!(count = assessment.questions.len(), "Persisting assessment");
        let assessment = self.repository.create(assessment).await.map_err(|e| {
            tracing::error!("Failed to persist generated assessment: {}", e);
            PipelineError::PersistFailed(e)
        })?;

        tracing::info!(assessment_id = assessment.id, "Assessment generated");
        Ok(assessment)
    }

    /// Fails fast before any network call. Trims the heading and defaults the topic.
    fn validate(&self, mut request: GenerationRequest) -> Result<GenerationRequest, PipelineError> {
        request.heading = request.heading.trim().to_string();
        request.topic = request.topic.trim().to_string();

        if request.heading.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "Please enter an assessment title".to_string(),
            ));
        }

        if request.heading.chars().count() > MAX_TITLE_CHARS
            || request.topic.chars().count() > MAX_TITLE_CHARS
        {
            return Err(PipelineError::InvalidRequest(format!(
                "Title and topic must be at most {} characters",
                MAX_TITLE_CHARS
            )));
        }

        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&request.question_count) {
            return Err(PipelineError::InvalidRequest(format!(
                "Number of questions must be between {} and {}",
                MIN_QUESTIONS, MAX_QUESTIONS
            )));
        }

        if request.document.bytes.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "Please upload a document".to_string(),
            ));
        }

        if request.document.bytes.len() > self.max_document_bytes {
            return Err(PipelineError::InvalidRequest(format!(
                "File size should be at most {} bytes",
                self.max_document_bytes
            )));
        }

        if request.topic.is_empty() {
            request.topic = DEFAULT_TOPIC.to_string();
        }

        Ok(request)
    }
}
