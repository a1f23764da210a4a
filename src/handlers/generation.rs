// src/handlers/generation.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    generation::{Document, GenerationPipeline, GenerationRequest},
    models::assessment::AssessmentEnvelope,
};

/// Generates an assessment from an uploaded document.
///
/// Multipart fields: `file`, `heading`, `topic` (optional), `numQuestions`.
/// Runs the whole pipeline inside the request; a failure reports the stage
/// it happened in.
pub async fn generate_assessment(
    State(pipeline): State<Arc<GenerationPipeline>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut heading = String::new();
    let mut topic = String::new();
    let mut question_count: Option<u32> = None;
    let mut document = Document {
        file_name: String::new(),
        content_type: "application/pdf".to_string(),
        bytes: Vec::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                document.file_name = field.file_name().unwrap_or("document").to_string();
                if let Some(content_type) = field.content_type() {
                    document.content_type = content_type.to_string();
                }
                document.bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?
                    .to_vec();
            }
            "heading" | "topic" | "numQuestions" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                match name.as_str() {
                    "heading" => heading = value,
                    "topic" => topic = value,
                    _ => {
                        let count = value.trim().parse().map_err(|_| {
                            AppError::BadRequest("numQuestions must be a number".to_string())
                        })?;
                        question_count = Some(count);
                    }
                }
            }
            other => tracing::debug!("Ignoring unknown multipart field '{}'", other),
        }
    }

    let request = GenerationRequest {
        heading,
        topic,
        question_count: question_count
            .ok_or(AppError::BadRequest("numQuestions is required".to_string()))?,
        document,
    };

    let assessment = pipeline.run(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(AssessmentEnvelope {
            success: true,
            assessment,
        }),
    ))
}
