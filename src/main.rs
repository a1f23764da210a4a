// src/main.rs

use assessment_engine::config::Config;
use assessment_engine::generation::{GenerationPipeline, RagIngestionClient, RagQuestionGenerator};
use assessment_engine::quiz::SessionRegistry;
use assessment_engine::repository::PgAssessmentRepository;
use assessment_engine::routes;
use assessment_engine::state::AppState;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    // One outbound client for the RAG service; its timeout bounds every stage call.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .expect("Failed to build HTTP client");

    let ingestion = RagIngestionClient::new(http.clone(), &config.rag_base_url)
        .expect("RAG_BASE_URL cannot be joined with /upload");
    let generator = RagQuestionGenerator::new(http, &config.rag_base_url)
        .expect("RAG_BASE_URL cannot be joined with /retrieve");

    let pipeline = GenerationPipeline::new(
        Arc::new(ingestion),
        Arc::new(generator),
        Arc::new(PgAssessmentRepository::new(pool.clone())),
        config.max_upload_bytes,
    );

    tracing::info!(rag_base_url = %config.rag_base_url, "Generation pipeline ready");

    let addr = config.bind_addr;
    // A session nobody starts within one quiz duration is dropped.
    let sessions =
        SessionRegistry::new(Duration::from_secs(u64::from(config.quiz_duration_secs)));
    let state = AppState {
        pool,
        config,
        pipeline: Arc::new(pipeline),
        sessions,
    };

    let app = routes::create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    axum::serve(listener, app).await.unwrap();
}
