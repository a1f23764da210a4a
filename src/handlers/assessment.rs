// src/handlers/assessment.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::assessment::{AssessmentEnvelope, NewAssessment, UpdateAssessment, validate_questions},
    repository::{AssessmentRepository, PgAssessmentRepository},
};

/// Lists all assessments, newest first.
pub async fn list_assessments(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let assessments = PgAssessmentRepository::new(pool).list().await.map_err(|e| {
        tracing::error!("Failed to list assessments: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(assessments))
}

/// Creates an assessment from hand-authored questions.
pub async fn create_assessment(
    State(pool): State<PgPool>,
    Json(payload): Json<NewAssessment>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let assessment = PgAssessmentRepository::new(pool).create(payload).await?;
    tracing::info!(assessment_id = assessment.id, "Assessment created");

    Ok((
        StatusCode::CREATED,
        Json(AssessmentEnvelope {
            success: true,
            assessment,
        }),
    ))
}

/// Fetches one assessment, including its answer key.
pub async fn get_assessment(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let assessment = PgAssessmentRepository::new(pool)
        .fetch(id)
        .await?
        .ok_or(AppError::NotFound("Assessment not found".to_string()))?;

    Ok(Json(AssessmentEnvelope {
        success: true,
        assessment,
    }))
}

/// Partially updates an assessment.
pub async fn update_assessment(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAssessment>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
    if blank(&payload.heading) || blank(&payload.topic) {
        return Err(AppError::BadRequest(
            "Heading and topic must not be blank".to_string(),
        ));
    }
    if let Some(questions) = &payload.questions {
        validate_questions(questions).map_err(|e| AppError::BadRequest(e.to_string()))?;
    }

    let assessment = PgAssessmentRepository::new(pool)
        .update(id, payload)
        .await?
        .ok_or(AppError::NotFound("Assessment not found".to_string()))?;

    Ok(Json(AssessmentEnvelope {
        success: true,
        assessment,
    }))
}

/// Deletes an assessment together with its recorded results.
pub async fn delete_assessment(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !PgAssessmentRepository::new(pool).delete(id).await? {
        return Err(AppError::NotFound("Assessment not found".to_string()));
    }

    tracing::info!(assessment_id = id, "Assessment deleted");
    Ok(StatusCode::NO_CONTENT)
}
