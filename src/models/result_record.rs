// src/models/result_record.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'assessment_results' table in the database.
/// One row per (assessment, student) pair.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub id: i64,
    #[serde(rename = "assesmentId")]
    pub assessment_id: i64,
    pub student_id: i64,
    /// Percentage score, 0-100.
    pub marks: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for recording a student's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewResultRecord {
    #[serde(rename = "assesmentId")]
    #[validate(range(min = 1))]
    pub assessment_id: i64,
    #[serde(rename = "studentId")]
    #[validate(range(min = 1))]
    pub student_id: i64,
    #[validate(range(min = 0, max = 100))]
    pub marks: i32,
}

/// Response envelope for a single stored result.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub success: bool,
    pub record: ResultRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_result_uses_portal_field_names() {
        let parsed: NewResultRecord =
            serde_json::from_str(r#"{"assesmentId": 7, "studentId": 3, "marks": 75}"#).unwrap();
        assert_eq!(parsed.assessment_id, 7);
        assert_eq!(parsed.student_id, 3);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_marks_out_of_range_rejected() {
        let record = NewResultRecord {
            assessment_id: 1,
            student_id: 1,
            marks: 101,
        };
        assert!(record.validate().is_err());
    }
}
