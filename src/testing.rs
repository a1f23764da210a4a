// src/testing.rs

//! In-memory collaborators and fixtures shared by the unit tests.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::Semaphore;

use crate::{
    generation::{CollaboratorError, Document, DocumentIngestion, IngestionReceipt, QuestionGenerator},
    models::{
        assessment::{AnswerOption, Assessment, NewAssessment, Question},
        result_record::{NewResultRecord, ResultRecord},
    },
    repository::{AssessmentRepository, RepositoryError, ResultRepository},
};

/// A valid question whose correct option is `correct_answer`.
pub fn question(correct_answer: usize) -> Question {
    Question {
        question_text: format!("Which option is number {}?", correct_answer),
        options: ["A", "B", "C", "D"]
            .iter()
            .map(|t| AnswerOption {
                text: format!("Option {}", t),
            })
            .collect(),
        correct_answer,
    }
}

/// An assessment with `count` questions; question `i` is keyed to `i % 4`.
pub fn sample_assessment(id: i64, count: usize) -> Assessment {
    let now = Utc::now();
    Assessment {
        id,
        heading: "Sample".to_string(),
        topic: "Testing".to_string(),
        questions: Json((0..count).map(|i| question(i % 4)).collect()),
        created_at: now,
        updated_at: now,
    }
}

pub fn result_record(assessment_id: i64, student_id: i64, marks: i32) -> ResultRecord {
    let now = Utc::now();
    ResultRecord {
        id: 1,
        assessment_id,
        student_id,
        marks,
        created_at: now,
        updated_at: now,
    }
}

/// Model output containing `count` well-formed questions as a JSON array.
pub fn valid_answer(count: usize) -> String {
    let questions: Vec<Question> = (0..count).map(|i| question(i % 4)).collect();
    serde_json::to_string_pretty(&questions).unwrap()
}

fn status_error(status: u16) -> CollaboratorError {
    CollaboratorError::Status {
        status,
        message: "stubbed failure".to_string(),
    }
}

#[derive(Default)]
pub struct FakeIngestion {
    calls: AtomicUsize,
    fail_status: AtomicU16,
}

impl FakeIngestion {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, status: u16) {
        self.fail_status.store(status, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentIngestion for FakeIngestion {
    async fn ingest(&self, _document: &Document) -> Result<IngestionReceipt, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_status.load(Ordering::SeqCst) {
            0 => Ok(IngestionReceipt::default()),
            status => Err(status_error(status)),
        }
    }
}

pub struct FakeGenerator {
    answer: Result<String, u16>,
    calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn new(answer: Result<String, u16>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionGenerator for FakeGenerator {
    async fn generate(&self, _question_count: u32) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().map_err(status_error)
    }
}

#[derive(Default)]
pub struct InMemoryAssessments {
    rows: Mutex<Vec<Assessment>>,
    fail: AtomicBool,
}

impl InMemoryAssessments {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn fail_creates(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AssessmentRepository for InMemoryAssessments {
    async fn create(&self, new: NewAssessment) -> Result<Assessment, RepositoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::Rejected {
                status: 500,
                message: "stubbed failure".to_string(),
            });
        }

        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        let assessment = Assessment {
            id: rows.len() as i64 + 1,
            heading: new.heading,
            topic: new.topic,
            questions: Json(new.questions),
            created_at: now,
            updated_at: now,
        };
        rows.push(assessment.clone());
        Ok(assessment)
    }

    async fn fetch(&self, id: i64) -> Result<Option<Assessment>, RepositoryError> {
        Ok(self.rows.lock().unwrap().iter().find(|a| a.id == id).cloned())
    }
}

/// Result sink that records every write.
///
/// `held()` builds one whose writes block until [`RecordingResults::release`].
/// `calls()` counts a write as soon as it starts.
pub struct RecordingResults {
    recorded: Mutex<Vec<NewResultRecord>>,
    calls: AtomicUsize,
    failures_left: AtomicUsize,
    gate: Option<Semaphore>,
}

impl Default for RecordingResults {
    fn default() -> Self {
        Self {
            recorded: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
            gate: None,
        }
    }
}

impl RecordingResults {
    pub fn held() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn recorded(&self) -> Vec<NewResultRecord> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultRepository for RecordingResults {
    async fn record(&self, result: NewResultRecord) -> Result<ResultRecord, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RepositoryError::Rejected {
                status: 503,
                message: "results store unavailable".to_string(),
            });
        }

        self.recorded.lock().unwrap().push(result.clone());
        Ok(result_record(
            result.assessment_id,
            result.student_id,
            result.marks,
        ))
    }
}
