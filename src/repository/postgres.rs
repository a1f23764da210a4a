// src/repository/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, types::Json};

use crate::models::{
    assessment::{Assessment, NewAssessment, Question, UpdateAssessment},
    result_record::{NewResultRecord, ResultRecord},
};

use super::{AssessmentRepository, RepositoryError, ResultRepository};

const ASSESSMENT_COLUMNS: &str = "id, heading, topic, questions, created_at, updated_at";
const RESULT_COLUMNS: &str = "id, assessment_id, student_id, marks, created_at, updated_at";

/// Assessment storage on the service's own Postgres pool.
#[derive(Clone)]
pub struct PgAssessmentRepository {
    pool: PgPool,
}

impl PgAssessmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists all assessments, newest first.
    pub async fn list(&self) -> Result<Vec<Assessment>, RepositoryError> {
        let rows = sqlx::query_as::<_, Assessment>(&format!(
            "SELECT {} FROM assessments ORDER BY created_at DESC, id DESC",
            ASSESSMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Applies the present fields of `update`. Returns `Ok(None)` if the id is unknown.
    pub async fn update(
        &self,
        id: i64,
        update: UpdateAssessment,
    ) -> Result<Option<Assessment>, RepositoryError> {
        let questions: Option<Json<Vec<Question>>> = update.questions.map(Json);

        let row = sqlx::query_as::<_, Assessment>(&format!(
            r#"
            UPDATE assessments SET
                heading = COALESCE($2, heading),
                topic = COALESCE($3, topic),
                questions = COALESCE($4, questions),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ASSESSMENT_COLUMNS
        ))
        .bind(id)
        .bind(update.heading.map(|h| h.trim().to_string()))
        .bind(update.topic.map(|t| t.trim().to_string()))
        .bind(questions)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Deletes an assessment (and, by cascade, its results). Returns whether a row was removed.
    pub async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM assessments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AssessmentRepository for PgAssessmentRepository {
    async fn create(&self, assessment: NewAssessment) -> Result<Assessment, RepositoryError> {
        let row = sqlx::query_as::<_, Assessment>(&format!(
            r#"
            INSERT INTO assessments (heading, topic, questions)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            ASSESSMENT_COLUMNS
        ))
        .bind(assessment.heading.trim())
        .bind(assessment.topic.trim())
        .bind(Json(&assessment.questions))
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn fetch(&self, id: i64) -> Result<Option<Assessment>, RepositoryError> {
        let row = sqlx::query_as::<_, Assessment>(&format!(
            "SELECT {} FROM assessments WHERE id = $1",
            ASSESSMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

/// Result storage on the service's own Postgres pool.
#[derive(Clone)]
pub struct PgResultRepository {
    pool: PgPool,
}

impl PgResultRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn by_student(&self, student_id: i64) -> Result<Vec<ResultRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, ResultRecord>(&format!(
            "SELECT {} FROM assessment_results WHERE student_id = $1 ORDER BY updated_at DESC",
            RESULT_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn by_assessment(
        &self,
        assessment_id: i64,
    ) -> Result<Vec<ResultRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, ResultRecord>(&format!(
            "SELECT {} FROM assessment_results WHERE assessment_id = $1 ORDER BY created_at DESC",
            RESULT_COLUMNS
        ))
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn find(
        &self,
        assessment_id: i64,
        student_id: i64,
    ) -> Result<Option<ResultRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, ResultRecord>(&format!(
            "SELECT {} FROM assessment_results WHERE assessment_id = $1 AND student_id = $2",
            RESULT_COLUMNS
        ))
        .bind(assessment_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl ResultRepository for PgResultRepository {
    /// Upsert: one record per student per assessment, the latest marks win.
    async fn record(&self, result: NewResultRecord) -> Result<ResultRecord, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM assessments WHERE id = $1)")
                .bind(result.assessment_id)
                .fetch_one(&self.pool)
                .await?;

        if !exists {
            return Err(RepositoryError::NotFound("Assessment not found".to_string()));
        }

        let row = sqlx::query_as::<_, ResultRecord>(&format!(
            r#"
            INSERT INTO assessment_results (assessment_id, student_id, marks)
            VALUES ($1, $2, $3)
            ON CONFLICT (assessment_id, student_id) DO UPDATE SET
                marks = EXCLUDED.marks,
                updated_at = NOW()
            RETURNING {}
            "#,
            RESULT_COLUMNS
        ))
        .bind(result.assessment_id)
        .bind(result.student_id)
        .bind(result.marks)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
