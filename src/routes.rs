// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{assessment, generation, quiz_session, result},
    state::AppState,
};

/// Room for the non-file multipart fields and part headers.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Assembles the main application router.
///
/// * Merges all sub-routers (assessments, results, quiz sessions).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    let assessment_routes = Router::new()
        .route(
            "/",
            get(assessment::list_assessments).post(assessment::create_assessment),
        )
        .route(
            "/generate",
            post(generation::generate_assessment).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/{id}",
            get(assessment::get_assessment)
                .put(assessment::update_assessment)
                .delete(assessment::delete_assessment),
        );

    let result_routes = Router::new()
        .route("/", post(result::record_result))
        .route("/user/{student_id}", get(result::results_for_student))
        .route(
            "/assessment/{assessment_id}",
            get(result::results_for_assessment),
        )
        .route(
            "/{assessment_id}/user/{student_id}",
            get(result::get_result),
        );

    let session_routes = Router::new()
        .route("/", post(quiz_session::create_session))
        .route(
            "/{id}",
            get(quiz_session::get_session).delete(quiz_session::delete_session),
        )
        .route("/{id}/start", post(quiz_session::start_session))
        .route("/{id}/answers", put(quiz_session::select_answer))
        .route("/{id}/submit", post(quiz_session::submit_session))
        .route("/{id}/retry", post(quiz_session::retry_submission));

    Router::new()
        .nest("/api/assessments", assessment_routes)
        .nest("/api/assessment-users", result_routes)
        .nest("/api/quiz-sessions", session_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
