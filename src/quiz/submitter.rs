// src/quiz/submitter.rs

use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    models::result_record::{NewResultRecord, ResultRecord},
    repository::{RepositoryError, ResultRepository},
};

use super::session::SubmissionClaim;

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("a result has already been submitted for this session")]
    AlreadySubmitted,

    #[error("a submission is already in flight")]
    InFlight,

    #[error("there is no failed submission to retry")]
    NothingToRetry,

    #[error("result submission failed: {0}")]
    SubmissionFailed(#[source] RepositoryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    InFlight,
    Accepted,
    Failed,
}

/// Sends a session's result to the results store, at most once.
///
/// One submitter belongs to one session. The first `submit` is the only call
/// that reaches the store; later calls fail with `AlreadySubmitted` without
/// any I/O. After a failed write the caller may ask for an explicit `retry`.
pub struct ResultSubmitter {
    sink: Arc<dyn ResultRepository>,
    phase: Mutex<Phase>,
}

impl ResultSubmitter {
    pub fn new(sink: Arc<dyn ResultRepository>) -> Self {
        Self {
            sink,
            phase: Mutex::new(Phase::Idle),
        }
    }

    pub async fn submit(&self, claim: &SubmissionClaim) -> Result<ResultRecord, SubmitError> {
        self.enter(|phase| match phase {
            Phase::Idle => Ok(()),
            Phase::InFlight => Err(SubmitError::InFlight),
            Phase::Accepted | Phase::Failed => Err(SubmitError::AlreadySubmitted),
        })?;
        self.send(claim).await
    }

    /// Re-attempts the write after a failure.
    pub async fn retry(&self, claim: &SubmissionClaim) -> Result<ResultRecord, SubmitError> {
        self.enter(|phase| match phase {
            Phase::Failed => Ok(()),
            Phase::Idle => Err(SubmitError::NothingToRetry),
            Phase::InFlight => Err(SubmitError::InFlight),
            Phase::Accepted => Err(SubmitError::AlreadySubmitted),
        })?;
        self.send(claim).await
    }

    pub fn is_accepted(&self) -> bool {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) == Phase::Accepted
    }

    /// Moves to `InFlight` if `allowed` accepts the current phase.
    fn enter(&self, allowed: impl FnOnce(Phase) -> Result<(), SubmitError>) -> Result<(), SubmitError> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        allowed(*phase)?;
        *phase = Phase::InFlight;
        Ok(())
    }

    fn finish(&self, outcome: Phase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = outcome;
    }

    async fn send(&self, claim: &SubmissionClaim) -> Result<ResultRecord, SubmitError> {
        let record = NewResultRecord {
            assessment_id: claim.assessment_id,
            student_id: claim.student_id,
            marks: i32::from(claim.marks),
        };

        match self.sink.record(record).await {
            Ok(stored) => {
                self.finish(Phase::Accepted);
                tracing::info!(
                    assessment_id = claim.assessment_id,
                    student_id = claim.student_id,
                    marks = claim.marks,
                    trigger = ?claim.trigger,
                    "Result submitted"
                );
                Ok(stored)
            }
            Err(e) => {
                self.finish(Phase::Failed);
                tracing::warn!(
                    assessment_id = claim.assessment_id,
                    student_id = claim.student_id,
                    "Result submission failed: {}",
                    e
                );
                Err(SubmitError::SubmissionFailed(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{quiz::session::SubmitTrigger, testing::RecordingResults};

    fn claim(trigger: SubmitTrigger) -> SubmissionClaim {
        SubmissionClaim {
            assessment_id: 5,
            student_id: 9,
            marks: 80,
            trigger,
        }
    }

    #[tokio::test]
    async fn test_second_submit_never_reaches_the_store() {
        let sink = Arc::new(RecordingResults::default());
        let submitter = ResultSubmitter::new(sink.clone());

        let stored = submitter.submit(&claim(SubmitTrigger::Learner)).await.unwrap();
        assert_eq!(stored.marks, 80);
        assert!(submitter.is_accepted());

        let again = submitter.submit(&claim(SubmitTrigger::TimerExpired)).await;
        assert!(matches!(again, Err(SubmitError::AlreadySubmitted)));
        assert_eq!(sink.calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_then_explicit_retry() {
        let sink = Arc::new(RecordingResults::default());
        sink.fail_next(1);
        let submitter = ResultSubmitter::new(sink.clone());
        let c = claim(SubmitTrigger::TimerExpired);

        assert!(matches!(
            submitter.submit(&c).await,
            Err(SubmitError::SubmissionFailed(_))
        ));
        // A failed first attempt still counts as the submission.
        assert!(matches!(
            submitter.submit(&c).await,
            Err(SubmitError::AlreadySubmitted)
        ));

        let stored = submitter.retry(&c).await.unwrap();
        assert_eq!(stored.student_id, 9);
        assert!(matches!(
            submitter.retry(&c).await,
            Err(SubmitError::AlreadySubmitted)
        ));
        assert_eq!(sink.calls(), 2);
    }

    #[tokio::test]
    async fn test_retry_without_failure_is_rejected() {
        let sink = Arc::new(RecordingResults::default());
        let submitter = ResultSubmitter::new(sink.clone());

        assert!(matches!(
            submitter.retry(&claim(SubmitTrigger::Learner)).await,
            Err(SubmitError::NothingToRetry)
        ));
        assert_eq!(sink.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_submits_fire_once() {
        let sink = Arc::new(RecordingResults::held());
        let submitter = Arc::new(ResultSubmitter::new(sink.clone()));

        let first = {
            let submitter = submitter.clone();
            tokio::spawn(async move { submitter.submit(&claim(SubmitTrigger::Learner)).await })
        };
        while sink.calls() == 0 {
            tokio::task::yield_now().await;
        }

        let second = submitter.submit(&claim(SubmitTrigger::TimerExpired)).await;
        assert!(matches!(second, Err(SubmitError::InFlight)));

        sink.release();
        assert!(first.await.unwrap().is_ok());
        assert_eq!(sink.calls(), 1);
    }
}
