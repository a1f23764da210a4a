// src/generation/orchestrator.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{CollaboratorError, ensure_success};
use crate::config::as_base_url;

/// Smallest number of questions a caller may request.
pub const MIN_QUESTIONS: u32 = 1;
/// Largest number of questions a caller may request.
pub const MAX_QUESTIONS: u32 = 20;

/// Builds the instruction sent to the model.
///
/// The prompt spells out the exact JSON shape the parser accepts, so a
/// compliant answer parses without any repair.
pub fn build_prompt(question_count: u32) -> String {
    format!(
        r#"Generate exactly {count} multiple choice questions based on the content of this document.

For each question, provide:
1. A clear question text
2. Four options labeled A, B, C, D
3. Indicate which option is correct

Format your response as a JSON array with this exact structure:
[
    {{
        "questionText": "Question text here?",
        "options": [
            {{"text": "Option A text"}},
            {{"text": "Option B text"}},
            {{"text": "Option C text"}},
            {{"text": "Option D text"}}
        ],
        "correctAnswer": 0
    }}
]

Where correctAnswer is the zero-based index (0-3) of the correct option.
Every question must have exactly four options and every option must have non-empty text.
Make sure questions cover different aspects of the document and vary in difficulty.
Return ONLY the JSON array, no additional text."#,
        count = question_count
    )
}

/// Requests generated questions from the AI collaborator.
///
/// Implementations return the raw model text and never interpret it.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, question_count: u32) -> Result<String, CollaboratorError>;
}

#[derive(Debug, Serialize)]
struct RetrieveRequest<'a> {
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    answer: String,
}

/// Client for the RAG service's `POST /retrieve` (`{question}` -> `{answer}`).
#[derive(Clone)]
pub struct RagQuestionGenerator {
    client: Client,
    endpoint: Url,
}

impl RagQuestionGenerator {
    pub fn new(client: Client, base_url: &Url) -> Result<Self, url::ParseError> {
        Ok(Self {
            client,
            endpoint: as_base_url(base_url.clone()).join("retrieve")?,
        })
    }
}

#[async_trait]
impl QuestionGenerator for RagQuestionGenerator {
    async fn generate(&self, question_count: u32) -> Result<String, CollaboratorError> {
        let prompt = build_prompt(question_count);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&RetrieveRequest { question: &prompt })
            .send()
            .await?;

        let body: RetrieveResponse = ensure_success(response).await?.json().await?;

        tracing::debug!(
            question_count,
            answer_len = body.answer.len(),
            "Received generation response"
        );

        Ok(body.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use std::time::Duration;

    async fn serve(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap()
    }

    #[test]
    fn test_prompt_names_count_and_schema() {
        let prompt = build_prompt(7);
        assert!(prompt.starts_with("Generate exactly 7 multiple choice questions"));
        assert!(prompt.contains("\"questionText\""));
        assert!(prompt.contains("\"correctAnswer\": 0"));
        assert!(prompt.contains("Return ONLY the JSON array"));
    }

    #[tokio::test]
    async fn test_generate_returns_raw_answer() {
        let app = Router::new().route(
            "/retrieve",
            post(|Json(body): Json<serde_json::Value>| async move {
                let asked = body["question"].as_str().unwrap_or_default().to_string();
                Json(serde_json::json!({ "answer": format!("echo: {}", asked) }))
            }),
        );
        let base = serve(app).await;

        let generator = RagQuestionGenerator::new(Client::new(), &base).unwrap();
        let answer = generator.generate(3).await.unwrap();

        assert!(answer.starts_with("echo: Generate exactly 3 multiple choice questions"));
    }

    #[tokio::test]
    async fn test_base_url_path_prefix_is_kept() {
        let app = Router::new().route(
            "/rag/retrieve",
            post(|| async { Json(serde_json::json!({ "answer": "prefixed" })) }),
        );
        let base = serve(app).await;
        let prefixed = Url::parse(&format!("{}rag", base)).unwrap();

        let generator = RagQuestionGenerator::new(Client::new(), &prefixed).unwrap();

        assert_eq!(generator.generate(1).await.unwrap(), "prefixed");
    }

    #[tokio::test]
    async fn test_generate_fails_on_error_status() {
        let app = Router::new().route(
            "/retrieve",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "no document indexed" })),
                )
            }),
        );
        let base = serve(app).await;

        let generator = RagQuestionGenerator::new(Client::new(), &base).unwrap();
        let err = generator.generate(3).await.unwrap_err();

        assert!(matches!(err, CollaboratorError::Status { status: 500, .. }));
        assert!(err.to_string().contains("no document indexed"));
    }

    #[tokio::test]
    async fn test_generate_times_out() {
        let app = Router::new().route(
            "/retrieve",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(serde_json::json!({ "answer": "[]" }))
            }),
        );
        let base = serve(app).await;

        let client = Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let generator = RagQuestionGenerator::new(client, &base).unwrap();
        let err = generator.generate(3).await.unwrap_err();

        assert!(matches!(err, CollaboratorError::Transport(ref e) if e.is_timeout()));
    }
}
