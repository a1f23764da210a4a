// src/quiz/mod.rs

//! Timed quiz attempts: the session state machine, its countdown, scoring
//! and the at-most-once result write.

pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod scorer;
pub mod session;
pub mod submitter;

pub use registry::SessionRegistry;
pub use runner::QuizHandle;
pub use scheduler::{IntervalScheduler, ManualScheduler, TickScheduler};
pub use session::{QuizSession, SessionError, SessionSnapshot, SessionState};
pub use submitter::{ResultSubmitter, SubmitError};
