// src/quiz/runner.rs

//! Drives one [`QuizSession`] from a single task.
//!
//! Learner commands and timer ticks arrive on channels consumed by one actor,
//! so they are applied one at a time and the `InProgress -> Submitting` claim
//! can only be won once. State changes are published on a `watch` channel.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};

use crate::models::result_record::ResultRecord;

use super::{
    scheduler::TickScheduler,
    session::{QuizSession, SessionError, SessionSnapshot, SessionState, SubmissionClaim},
    submitter::{ResultSubmitter, SubmitError},
};

const TICK_PERIOD: Duration = Duration::from_secs(1);

type Reply = oneshot::Sender<Result<SessionSnapshot, SessionError>>;

enum Command {
    Start(Reply),
    SelectAnswer {
        question: usize,
        option: usize,
        reply: Reply,
    },
    Submit {
        manual: bool,
        reply: Reply,
    },
    RetrySubmission(Reply),
    Teardown,
}

/// Cloneable handle to a running session.
///
/// The session task ends once the result is stored, when the last handle is
/// dropped, or on [`QuizHandle::teardown`]. A submission already in flight is
/// allowed to finish, but nothing else happens afterwards and commands fail
/// with `SessionError::Closed`.
#[derive(Clone)]
pub struct QuizHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl QuizHandle {
    /// Spawns the session actor on the current tokio runtime.
    pub fn spawn(
        session: QuizSession,
        scheduler: Box<dyn TickScheduler>,
        submitter: ResultSubmitter,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (ticks_tx, ticks_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(session.snapshot());

        let actor = SessionActor {
            session,
            scheduler,
            submitter,
            commands: commands_rx,
            ticks: ticks_rx,
            ticks_tx,
            snapshots: snapshots_tx,
        };
        tokio::spawn(actor.run());

        Self {
            commands: commands_tx,
            snapshots: snapshots_rx,
        }
    }

    pub async fn start(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::Start).await
    }

    pub async fn select_answer(
        &self,
        question: usize,
        option: usize,
    ) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| Command::SelectAnswer {
            question,
            option,
            reply,
        })
        .await
    }

    /// Claims submission and waits for the result write.
    ///
    /// While a failed write awaits retry this is a no-op returning the
    /// current snapshot. A failed write yields `SubmissionFailed`; the score
    /// stays available through [`QuizHandle::snapshot`].
    pub async fn submit(&self, manual: bool) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| Command::Submit { manual, reply }).await
    }

    /// Re-attempts only the result write after a failed submission.
    pub async fn retry_submission(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::RetrySubmission).await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Stream of state changes. The current value is always available.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Stops the session: cancels the timer and ignores any further commands.
    pub fn teardown(&self) {
        let _ = self.commands.send(Command::Teardown);
    }

    async fn request(
        &self,
        make: impl FnOnce(Reply) -> Command,
    ) -> Result<SessionSnapshot, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)?
    }
}

struct SessionActor {
    session: QuizSession,
    scheduler: Box<dyn TickScheduler>,
    submitter: ResultSubmitter,
    commands: mpsc::UnboundedReceiver<Command>,
    ticks: mpsc::UnboundedReceiver<()>,
    ticks_tx: mpsc::UnboundedSender<()>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionActor {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Teardown) | None => break,
                    Some(command) => self.handle(command).await,
                },
                Some(()) = self.ticks.recv() => self.on_tick().await,
            }

            // Nothing can change after the result is stored; the final
            // snapshot stays readable through the watch receivers.
            if self.session.state() == SessionState::Completed {
                break;
            }
        }

        self.scheduler.cancel();
        tracing::debug!(
            assessment_id = self.session.assessment().id,
            state = ?self.session.state(),
            "Quiz session closed"
        );
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Start(reply) => {
                let result = self.start();
                let _ = reply.send(result);
            }
            Command::SelectAnswer {
                question,
                option,
                reply,
            } => {
                let result = self
                    .session
                    .select_answer(question, option)
                    .map(|()| self.publish());
                let _ = reply.send(result);
            }
            Command::Submit { manual, reply } => {
                let result = match self.session.state() {
                    SessionState::NotStarted => Err(SessionError::InvalidTransition {
                        state: SessionState::NotStarted,
                        action: "submit",
                    }),
                    _ => match self.session.submit(manual) {
                        Some(claim) => self.deliver(claim).await,
                        None => Ok(self.session.snapshot()),
                    },
                };
                let _ = reply.send(result);
            }
            Command::RetrySubmission(reply) => {
                let result = self.retry().await;
                let _ = reply.send(result);
            }
            Command::Teardown => {}
        }
    }

    fn start(&mut self) -> Result<SessionSnapshot, SessionError> {
        self.session.start()?;

        let ticks = self.ticks_tx.clone();
        self.scheduler.schedule(
            TICK_PERIOD,
            Box::new(move || {
                let _ = ticks.send(());
            }),
        );

        tracing::info!(
            assessment_id = self.session.assessment().id,
            remaining_secs = self.session.remaining_secs(),
            "Quiz session started"
        );
        Ok(self.publish())
    }

    async fn on_tick(&mut self) {
        if self.session.state() != SessionState::InProgress {
            return;
        }

        match self.session.tick() {
            Some(claim) => {
                tracing::info!(
                    assessment_id = claim.assessment_id,
                    student_id = claim.student_id,
                    "Quiz time expired, submitting automatically"
                );
                // Timer-driven submission has nobody waiting on it; the outcome is published.
                let _ = self.deliver(claim).await;
            }
            None => {
                self.publish();
            }
        }
    }

    /// Performs the claimed write. The timer is stopped before any I/O.
    async fn deliver(&mut self, claim: SubmissionClaim) -> Result<SessionSnapshot, SessionError> {
        self.scheduler.cancel();
        self.publish();

        let outcome = self.submitter.submit(&claim).await;
        self.settle(claim.marks, outcome)
    }

    async fn retry(&mut self) -> Result<SessionSnapshot, SessionError> {
        let claim = match (self.session.state(), self.session.claim()) {
            (SessionState::Submitting, Some(claim)) if self.session.submission_error().is_some() => {
                claim.clone()
            }
            (state, _) => {
                return Err(SessionError::InvalidTransition {
                    state,
                    action: "retry submission",
                });
            }
        };

        let outcome = self.submitter.retry(&claim).await;
        self.settle(claim.marks, outcome)
    }

    fn settle(
        &mut self,
        score: u8,
        outcome: Result<ResultRecord, SubmitError>,
    ) -> Result<SessionSnapshot, SessionError> {
        match outcome {
            Ok(record) => {
                self.session.mark_completed(record);
                Ok(self.publish())
            }
            Err(e) => {
                let message = e.to_string();
                self.session.mark_submission_failed(message.clone());
                self.publish();
                Err(SessionError::SubmissionFailed { score, message })
            }
        }
    }

    fn publish(&self) -> SessionSnapshot {
        let snapshot = self.session.snapshot();
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }
}
