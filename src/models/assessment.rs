// src/models/assessment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::{Validate, ValidationError};

/// Every question carries exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// One answer choice. Its position inside the question is the answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub text: String,
}

/// A multiple-choice question as stored in the `questions` JSONB column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_text: String,
    pub options: Vec<AnswerOption>,
    /// Zero-based index into `options`.
    pub correct_answer: usize,
}

impl Question {
    /// Checks the structural invariants of a question.
    ///
    /// Returns a short reason on the first violation.
    pub fn check(&self) -> Result<(), &'static str> {
        if self.question_text.trim().is_empty() {
            return Err("questionText must not be empty");
        }
        if self.options.len() != OPTIONS_PER_QUESTION {
            return Err("a question must have exactly 4 options");
        }
        if self.options.iter().any(|o| o.text.trim().is_empty()) {
            return Err("option text must not be empty");
        }
        if self.correct_answer >= OPTIONS_PER_QUESTION {
            return Err("correctAnswer must be an index between 0 and 3");
        }
        Ok(())
    }
}

/// Represents the 'assessments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: i64,
    pub heading: String,
    pub topic: String,
    /// Ordered question list, stored as a JSON array.
    pub questions: Json<Vec<Question>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for sending a question to a learner (excludes the answer key).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub question_text: String,
    pub options: Vec<AnswerOption>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            question_text: q.question_text.clone(),
            options: q.options.clone(),
        }
    }
}

/// DTO for creating a new assessment, either by hand or from generated content.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewAssessment {
    #[validate(length(min = 1, max = 200), custom(function = not_blank))]
    pub heading: String,
    #[validate(length(min = 1, max = 200), custom(function = not_blank))]
    pub topic: String,
    #[validate(length(min = 1, max = 100), custom(function = validate_questions))]
    pub questions: Vec<Question>,
}

/// DTO for updating an assessment. Fields are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateAssessment {
    #[validate(length(min = 1, max = 200))]
    pub heading: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub topic: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub questions: Option<Vec<Question>>,
}

/// Response envelope used by the portal for a single assessment.
///
/// The `assesment` spelling is part of the existing wire contract.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssessmentEnvelope {
    pub success: bool,
    #[serde(rename = "assesment")]
    pub assessment: Assessment,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("must_not_be_blank"));
    }
    Ok(())
}

pub fn validate_questions(questions: &[Question]) -> Result<(), ValidationError> {
    for (index, question) in questions.iter().enumerate() {
        if let Err(reason) = question.check() {
            let mut err = ValidationError::new("invalid_question");
            err.message = Some(format!("question {}: {}", index, reason).into());
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: &[&str], correct: usize) -> Question {
        Question {
            question_text: "What holds the roof up?".to_string(),
            options: options
                .iter()
                .map(|t| AnswerOption { text: t.to_string() })
                .collect(),
            correct_answer: correct,
        }
    }

    #[test]
    fn test_question_check_accepts_well_formed() {
        assert!(question(&["a", "b", "c", "d"], 3).check().is_ok());
    }

    #[test]
    fn test_question_check_rejects_three_options() {
        assert!(question(&["a", "b", "c"], 0).check().is_err());
    }

    #[test]
    fn test_question_check_rejects_blank_option_and_bad_index() {
        assert!(question(&["a", " ", "c", "d"], 0).check().is_err());
        assert!(question(&["a", "b", "c", "d"], 4).check().is_err());
    }

    #[test]
    fn test_new_assessment_validation() {
        let ok = NewAssessment {
            heading: "Unit 1".to_string(),
            topic: "Biology".to_string(),
            questions: vec![question(&["a", "b", "c", "d"], 1)],
        };
        assert!(ok.validate().is_ok());

        let blank_heading = NewAssessment {
            heading: "   ".to_string(),
            ..ok.clone()
        };
        assert!(blank_heading.validate().is_err());

        let no_questions = NewAssessment {
            questions: vec![],
            ..ok.clone()
        };
        assert!(no_questions.validate().is_err());

        let bad_question = NewAssessment {
            questions: vec![question(&["a", "b", "c"], 1)],
            ..ok
        };
        assert!(bad_question.validate().is_err());
    }

    #[test]
    fn test_question_wire_shape_is_camel_case() {
        let json = serde_json::to_value(question(&["a", "b", "c", "d"], 2)).unwrap();
        assert_eq!(json["questionText"], "What holds the roof up?");
        assert_eq!(json["correctAnswer"], 2);
        assert_eq!(json["options"][0]["text"], "a");
    }
}
