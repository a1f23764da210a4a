// src/handlers/quiz_session.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::{
        assessment::PublicQuestion,
        quiz_session::{CreateSessionRequest, SelectAnswerRequest, SessionCreated, SubmitRequest},
    },
    quiz::{
        IntervalScheduler, QuizHandle, QuizSession, ResultSubmitter, SessionRegistry,
        SessionState,
    },
    repository::{AssessmentRepository, PgAssessmentRepository, PgResultRepository},
};

async fn lookup(sessions: &SessionRegistry, id: Uuid) -> Result<QuizHandle, AppError> {
    sessions
        .get(id)
        .await
        .ok_or(AppError::NotFound("Quiz session not found".to_string()))
}

/// Opens a quiz attempt for a student. The session starts in `NotStarted`.
pub async fn create_session(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(sessions): State<SessionRegistry>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.student_id < 1 {
        return Err(AppError::BadRequest("studentId must be positive".to_string()));
    }

    let assessment = PgAssessmentRepository::new(pool.clone())
        .fetch(payload.assessment_id)
        .await?
        .ok_or(AppError::NotFound("Assessment not found".to_string()))?;

    if assessment.questions.is_empty() {
        return Err(AppError::BadRequest("Assessment has no questions".to_string()));
    }

    let questions: Vec<PublicQuestion> = assessment.questions.iter().map(Into::into).collect();
    let heading = assessment.heading.clone();
    let topic = assessment.topic.clone();

    let session = QuizSession::new(
        Arc::new(assessment),
        payload.student_id,
        config.quiz_duration_secs,
    );
    let handle = QuizHandle::spawn(
        session,
        Box::new(IntervalScheduler::new()),
        ResultSubmitter::new(Arc::new(PgResultRepository::new(pool))),
    );
    let snapshot = handle.snapshot();
    let session_id = sessions.insert(handle).await;

    tracing::info!(
        %session_id,
        assessment_id = payload.assessment_id,
        student_id = payload.student_id,
        "Quiz session created"
    );

    Ok((
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id,
            heading,
            topic,
            questions,
            snapshot,
        }),
    ))
}

pub async fn get_session(
    State(sessions): State<SessionRegistry>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = lookup(&sessions, id).await?;
    Ok(Json(handle.snapshot()))
}

/// Starts the countdown.
pub async fn start_session(
    State(sessions): State<SessionRegistry>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = lookup(&sessions, id).await?.start().await?;
    Ok(Json(snapshot))
}

pub async fn select_answer(
    State(sessions): State<SessionRegistry>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = lookup(&sessions, id)
        .await?
        .select_answer(payload.question_index, payload.option_index)
        .await?;
    Ok(Json(snapshot))
}

/// Learner-initiated submission.
///
/// Unanswered questions must be confirmed with `confirmUnanswered`. Once the
/// session has left `InProgress` this just returns the current snapshot.
pub async fn submit_session(
    State(sessions): State<SessionRegistry>,
    Path(id): Path<Uuid>,
    payload: Option<Json<SubmitRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.unwrap_or_default();
    let handle = lookup(&sessions, id).await?;

    let current = handle.snapshot();
    let unanswered = current.total_questions - current.answered;
    if current.state == SessionState::InProgress && unanswered > 0 && !payload.confirm_unanswered
    {
        return Err(AppError::BadRequest(format!(
            "{} question(s) unanswered; resubmit with confirmUnanswered to continue",
            unanswered
        )));
    }

    let snapshot = handle.submit(true).await?;
    Ok(Json(snapshot))
}

/// Re-attempts the result write after a failed submission.
pub async fn retry_submission(
    State(sessions): State<SessionRegistry>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = lookup(&sessions, id).await?.retry_submission().await?;
    Ok(Json(snapshot))
}

/// Tears the session down. An in-flight submission still completes.
pub async fn delete_session(
    State(sessions): State<SessionRegistry>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !sessions.remove(id).await {
        return Err(AppError::NotFound("Quiz session not found".to_string()));
    }
    tracing::info!(session_id = %id, "Quiz session removed");
    Ok(StatusCode::NO_CONTENT)
}
