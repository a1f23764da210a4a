// src/quiz/session.rs

//! The per-attempt state machine.
//!
//! `NotStarted -> InProgress -> Submitting -> Completed`. Timer expiry is not
//! a state of its own: the tick that brings `remaining_secs` to zero claims
//! `Submitting` with the timer as trigger. The claim is single-fire; once the
//! session has left `InProgress`, further ticks and submits do nothing.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use serde::Serialize;

use crate::models::{
    assessment::{Assessment, OPTIONS_PER_QUESTION},
    result_record::ResultRecord,
};

use super::scorer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    NotStarted,
    InProgress,
    Submitting,
    Completed,
}

/// What moved the session into `Submitting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmitTrigger {
    Learner,
    TimerExpired,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("cannot {action} while the session is {state:?}")]
    InvalidTransition {
        state: SessionState,
        action: &'static str,
    },

    #[error("question index {index} is out of range (assessment has {total} questions)")]
    QuestionOutOfRange { index: usize, total: usize },

    #[error("option index {index} is out of range")]
    OptionOutOfRange { index: usize },

    #[error("result submission failed ({message}); the computed score of {score} was kept")]
    SubmissionFailed { score: u8, message: String },

    #[error("the session has been closed")]
    Closed,
}

/// The write a successful claim must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionClaim {
    pub assessment_id: i64,
    pub student_id: i64,
    pub marks: u8,
    pub trigger: SubmitTrigger,
}

/// Observable view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub assessment_id: i64,
    pub student_id: i64,
    pub state: SessionState,
    pub remaining_seconds: u32,
    /// `Some(true)` when the timer forced submission.
    pub auto_submit: Option<bool>,
    pub score: Option<u8>,
    pub correct_count: Option<usize>,
    pub total_questions: usize,
    pub answered: usize,
    pub selected_answers: BTreeMap<usize, usize>,
    /// Set while the last submission attempt has failed.
    pub submission_error: Option<String>,
    pub result: Option<ResultRecord>,
}

pub struct QuizSession {
    assessment: Arc<Assessment>,
    student_id: i64,
    duration_secs: u32,
    remaining_secs: u32,
    selected: HashMap<usize, usize>,
    state: SessionState,
    claim: Option<SubmissionClaim>,
    correct_count: Option<usize>,
    submission_error: Option<String>,
    result: Option<ResultRecord>,
}

impl QuizSession {
    pub fn new(assessment: Arc<Assessment>, student_id: i64, duration_secs: u32) -> Self {
        Self {
            assessment,
            student_id,
            duration_secs,
            remaining_secs: duration_secs,
            selected: HashMap::new(),
            state: SessionState::NotStarted,
            claim: None,
            correct_count: None,
            submission_error: None,
            result: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn assessment(&self) -> &Assessment {
        &self.assessment
    }

    /// Fixed once submission has been claimed.
    pub fn score(&self) -> Option<u8> {
        self.claim.as_ref().map(|c| c.marks)
    }

    pub fn claim(&self) -> Option<&SubmissionClaim> {
        self.claim.as_ref()
    }

    pub fn unanswered(&self) -> usize {
        self.assessment.questions.len() - self.selected.len()
    }

    /// `NotStarted -> InProgress`. Resets the countdown to the full budget.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::NotStarted {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                action: "start",
            });
        }
        self.state = SessionState::InProgress;
        self.remaining_secs = self.duration_secs;
        Ok(())
    }

    /// Records (or replaces) the answer for one question.
    pub fn select_answer(&mut self, question: usize, option: usize) -> Result<(), SessionError> {
        if self.state != SessionState::InProgress {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                action: "select an answer",
            });
        }

        let total = self.assessment.questions.len();
        if question >= total {
            return Err(SessionError::QuestionOutOfRange {
                index: question,
                total,
            });
        }
        if option >= OPTIONS_PER_QUESTION {
            return Err(SessionError::OptionOutOfRange { index: option });
        }

        self.selected.insert(question, option);
        Ok(())
    }

    /// Advances the countdown by one second.
    ///
    /// Returns the claim when this tick expired the session.
    pub fn tick(&mut self) -> Option<SubmissionClaim> {
        if self.state != SessionState::InProgress {
            return None;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            return self.claim_submission(SubmitTrigger::TimerExpired);
        }
        None
    }

    /// `InProgress -> Submitting`. `manual` is false for timer-forced submission.
    ///
    /// Returns `None` (and changes nothing) unless the session is in progress.
    pub fn submit(&mut self, manual: bool) -> Option<SubmissionClaim> {
        let trigger = if manual {
            SubmitTrigger::Learner
        } else {
            SubmitTrigger::TimerExpired
        };
        self.claim_submission(trigger)
    }

    fn claim_submission(&mut self, trigger: SubmitTrigger) -> Option<SubmissionClaim> {
        if self.state != SessionState::InProgress {
            return None;
        }

        let tally = scorer::tally(&self.assessment.questions, &self.selected);
        let claim = SubmissionClaim {
            assessment_id: self.assessment.id,
            student_id: self.student_id,
            marks: tally.marks,
            trigger,
        };

        self.state = SessionState::Submitting;
        self.correct_count = Some(tally.correct);
        self.claim = Some(claim.clone());
        Some(claim)
    }

    /// `Submitting -> Completed` once the result is durably stored.
    pub fn mark_completed(&mut self, record: ResultRecord) {
        if self.state == SessionState::Submitting {
            self.state = SessionState::Completed;
            self.submission_error = None;
            self.result = Some(record);
        }
    }

    /// Keeps the session in `Submitting` with its score, noting the failure.
    pub fn mark_submission_failed(&mut self, message: String) {
        if self.state == SessionState::Submitting {
            self.submission_error = Some(message);
        }
    }

    pub fn submission_error(&self) -> Option<&str> {
        self.submission_error.as_deref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            assessment_id: self.assessment.id,
            student_id: self.student_id,
            state: self.state,
            remaining_seconds: self.remaining_secs,
            auto_submit: self
                .claim
                .as_ref()
                .map(|c| c.trigger == SubmitTrigger::TimerExpired),
            score: self.score(),
            correct_count: self.correct_count,
            total_questions: self.assessment.questions.len(),
            answered: self.selected.len(),
            selected_answers: self.selected.iter().map(|(&q, &o)| (q, o)).collect(),
            submission_error: self.submission_error.clone(),
            result: self.result.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{result_record, sample_assessment};

    fn session(questions: usize, duration: u32) -> QuizSession {
        QuizSession::new(Arc::new(sample_assessment(1, questions)), 42, duration)
    }

    #[test]
    fn test_start_initializes_countdown() {
        let mut s = session(2, 1800);
        assert_eq!(s.state(), SessionState::NotStarted);

        s.start().unwrap();

        assert_eq!(s.state(), SessionState::InProgress);
        assert_eq!(s.remaining_secs(), 1800);
        assert!(matches!(
            s.start(),
            Err(SessionError::InvalidTransition { action: "start", .. })
        ));
    }

    #[test]
    fn test_ticks_before_start_are_ignored() {
        let mut s = session(1, 10);
        assert_eq!(s.tick(), None);
        assert_eq!(s.remaining_secs(), 10);
        assert_eq!(s.submit(true), None);
        assert_eq!(s.state(), SessionState::NotStarted);
    }

    #[test]
    fn test_select_answer_last_write_wins() {
        let mut s = session(3, 60);
        assert!(s.select_answer(0, 1).is_err());
        s.start().unwrap();

        s.select_answer(0, 1).unwrap();
        s.select_answer(0, 3).unwrap();

        let snap = s.snapshot();
        assert_eq!(snap.answered, 1);
        assert_eq!(snap.selected_answers.get(&0), Some(&3));
        assert_eq!(s.unanswered(), 2);
    }

    #[test]
    fn test_select_answer_range_checks() {
        let mut s = session(2, 60);
        s.start().unwrap();

        assert_eq!(
            s.select_answer(2, 0),
            Err(SessionError::QuestionOutOfRange { index: 2, total: 2 })
        );
        assert_eq!(
            s.select_answer(1, 4),
            Err(SessionError::OptionOutOfRange { index: 4 })
        );
    }

    #[test]
    fn test_expiry_happens_on_the_tick_that_reaches_zero() {
        let mut s = session(1, 3);
        s.start().unwrap();

        assert_eq!(s.tick(), None);
        assert_eq!(s.tick(), None);
        assert_eq!(s.remaining_secs(), 1);
        assert_eq!(s.state(), SessionState::InProgress);

        let claim = s.tick().expect("third tick expires the session");

        assert_eq!(claim.trigger, SubmitTrigger::TimerExpired);
        assert_eq!(s.remaining_secs(), 0);
        assert_eq!(s.state(), SessionState::Submitting);
        assert_eq!(s.snapshot().auto_submit, Some(true));
    }

    #[test]
    fn test_manual_submit_at_1795_seconds() {
        let mut s = session(4, 1800);
        s.start().unwrap();
        for _ in 0..5 {
            assert_eq!(s.tick(), None);
        }
        assert_eq!(s.remaining_secs(), 1795);

        let claim = s.submit(true).unwrap();

        assert_eq!(claim.trigger, SubmitTrigger::Learner);
        assert_eq!(s.state(), SessionState::Submitting);
        assert_eq!(s.snapshot().auto_submit, Some(false));

        // Later ticks neither decrement nor re-claim.
        assert_eq!(s.tick(), None);
        assert_eq!(s.remaining_secs(), 1795);
    }

    #[test]
    fn test_submission_claim_is_single_fire() {
        let mut s = session(2, 1);
        s.start().unwrap();

        assert!(s.submit(true).is_some());
        assert_eq!(s.tick(), None);
        assert_eq!(s.submit(true), None);
        assert_eq!(s.submit(false), None);
    }

    #[test]
    fn test_score_fixed_at_claim() {
        let mut s = session(4, 60);
        s.start().unwrap();
        // sample_assessment keys: question i has correct answer i % 4
        s.select_answer(0, 0).unwrap();
        s.select_answer(1, 1).unwrap();
        s.select_answer(2, 2).unwrap();
        s.select_answer(3, 0).unwrap();

        let claim = s.submit(true).unwrap();
        assert_eq!(claim.marks, 75);
        assert_eq!(s.score(), Some(75));
        assert_eq!(s.snapshot().correct_count, Some(3));

        assert!(s.select_answer(3, 3).is_err());
        assert_eq!(s.score(), Some(75));
    }

    #[test]
    fn test_failed_submission_keeps_score_and_state() {
        let mut s = session(1, 60);
        s.start().unwrap();
        s.submit(true).unwrap();

        s.mark_submission_failed("connection refused".to_string());

        let snap = s.snapshot();
        assert_eq!(snap.state, SessionState::Submitting);
        assert_eq!(snap.score, Some(0));
        assert_eq!(snap.submission_error.as_deref(), Some("connection refused"));

        s.mark_completed(result_record(1, 42, 0));
        let snap = s.snapshot();
        assert_eq!(snap.state, SessionState::Completed);
        assert_eq!(snap.submission_error, None);
        assert!(snap.result.is_some());
    }

    #[test]
    fn test_zero_budget_expires_on_first_tick() {
        let mut s = session(1, 0);
        s.start().unwrap();
        assert!(s.tick().is_some());
        assert_eq!(s.state(), SessionState::Submitting);
    }
}
