//! Persistence collaborators.
//!
//! The engine only depends on the two traits below. `postgres` backs them
//! with the service's own database; `http` talks to a remote portal that
//! exposes the same REST surface.

pub mod http;
pub mod postgres;

use async_trait::async_trait;

use crate::models::{
    assessment::{Assessment, NewAssessment},
    result_record::{NewResultRecord, ResultRecord},
};

pub use http::PortalClient;
pub use postgres::{PgAssessmentRepository, PgResultRepository};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The collaborator answered with a non-success status.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("{0}")]
    NotFound(String),
}

/// Stores and loads assessment aggregates.
#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    async fn create(&self, assessment: NewAssessment) -> Result<Assessment, RepositoryError>;

    /// Returns `Ok(None)` when no assessment has the given id.
    async fn fetch(&self, id: i64) -> Result<Option<Assessment>, RepositoryError>;
}

/// Durable sink for scored attempts.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    async fn record(&self, result: NewResultRecord) -> Result<ResultRecord, RepositoryError>;
}
