// src/handlers/result.rs

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
    models::result_record::{NewResultRecord, ResultEnvelope},
    repository::{PgResultRepository, ResultRepository},
};

/// Records a student's marks for an assessment. A repeat overwrites the marks.
pub async fn record_result(
    State(pool): State<PgPool>,
    Json(payload): Json<NewResultRecord>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let record = PgResultRepository::new(pool).record(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(ResultEnvelope {
            success: true,
            record,
        }),
    ))
}

pub async fn results_for_student(
    State(pool): State<PgPool>,
    Path(student_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let records = PgResultRepository::new(pool).by_student(student_id).await?;
    Ok(Json(records))
}

/// Results for one assessment, newest first.
pub async fn results_for_assessment(
    State(pool): State<PgPool>,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let records = PgResultRepository::new(pool)
        .by_assessment(assessment_id)
        .await?;
    Ok(Json(records))
}

pub async fn get_result(
    State(pool): State<PgPool>,
    Path((assessment_id, student_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let record = PgResultRepository::new(pool)
        .find(assessment_id, student_id)
        .await?
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    Ok(Json(ResultEnvelope {
        success: true,
        record,
    }))
}
