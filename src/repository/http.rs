// src/repository/http.rs

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::models::{
    assessment::{Assessment, AssessmentEnvelope, NewAssessment},
    result_record::{NewResultRecord, ResultEnvelope, ResultRecord},
};

use super::{AssessmentRepository, RepositoryError, ResultRepository};

/// Error body returned by the portal (`{"error": "..."}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// REST client for a remote portal exposing `/api/assessments` and `/api/assessment-users`.
#[derive(Clone)]
pub struct PortalClient {
    client: Client,
    base_url: Url,
}

impl PortalClient {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn endpoint(&self, path: &str) -> Result<Url, RepositoryError> {
        self.base_url
            .join(path)
            .map_err(|e| RepositoryError::Rejected {
                status: 0,
                message: format!("invalid portal url: {}", e),
            })
    }
}

/// Turns a non-success response into `RepositoryError::Rejected`, keeping the portal's message.
async fn ensure_success(response: Response) -> Result<Response, RepositoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };

    Err(RepositoryError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl AssessmentRepository for PortalClient {
    async fn create(&self, assessment: NewAssessment) -> Result<Assessment, RepositoryError> {
        let response = self
            .client
            .post(self.endpoint("api/assessments")?)
            .json(&assessment)
            .send()
            .await?;

        let envelope: AssessmentEnvelope = ensure_success(response).await?.json().await?;
        Ok(envelope.assessment)
    }

    async fn fetch(&self, id: i64) -> Result<Option<Assessment>, RepositoryError> {
        let response = self
            .client
            .get(self.endpoint(&format!("api/assessments/{}", id))?)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let envelope: AssessmentEnvelope = ensure_success(response).await?.json().await?;
        Ok(Some(envelope.assessment))
    }
}

#[async_trait]
impl ResultRepository for PortalClient {
    async fn record(&self, result: NewResultRecord) -> Result<ResultRecord, RepositoryError> {
        let response = self
            .client
            .post(self.endpoint("api/assessment-users")?)
            .json(&result)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RepositoryError::NotFound("Assessment not found".to_string()));
        }

        let envelope: ResultEnvelope = ensure_success(response).await?.json().await?;
        Ok(envelope.record)
    }
}
