// src/models/quiz_session.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{models::assessment::PublicQuestion, quiz::session::SessionSnapshot};

/// DTO for opening a quiz attempt.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub assessment_id: i64,
    pub student_id: i64,
}

/// Returned when an attempt is opened. Questions never carry the answer key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub heading: String,
    pub topic: String,
    pub questions: Vec<PublicQuestion>,
    pub snapshot: SessionSnapshot,
}

/// DTO for selecting (or changing) an answer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectAnswerRequest {
    pub question_index: usize,
    pub option_index: usize,
}

/// DTO for a learner-initiated submission.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Must be set when unanswered questions remain.
    #[serde(default)]
    pub confirm_unanswered: bool,
}
