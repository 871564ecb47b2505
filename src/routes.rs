// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::MAX_RECORDING_BYTES,
    handlers::{admin, auth, interview},
    state::AppState,
    utils::jwt::admin_middleware,
};

/// Headroom for the non-file multipart fields of a submission.
const SUBMIT_FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Assembles the main application router.
///
/// * Candidate routes are open; the token is checked by the handlers.
/// * Recruiter routes sit behind the admin key guard.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let mut origins: Vec<HeaderValue> = vec![
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];
    if let Some(origin) = state
        .config
        .app_url
        .as_deref()
        .and_then(|url| HeaderValue::from_str(url.trim_end_matches('/')).ok())
    {
        origins.push(origin);
    }

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let admin_guard = middleware::from_fn_with_state(state.clone(), admin_middleware);

    let auth_routes = Router::new()
        .route("/validate-token", get(auth::validate_token))
        // Protected: only recruiters issue links
        .merge(
            Router::new()
                .route("/generate-link", post(auth::generate_link))
                .route("/sessions", get(auth::list_sessions))
                .layer(admin_guard.clone()),
        );

    let interview_routes = Router::new()
        .route("/questions/{role}", get(interview::get_questions))
        .route(
            "/submit",
            post(interview::submit_interview).layer(DefaultBodyLimit::max(
                MAX_RECORDING_BYTES + SUBMIT_FORM_OVERHEAD_BYTES,
            )),
        )
        .route("/recording/{sessionId}", get(interview::download_recording))
        .route("/telemetry", post(interview::report_telemetry))
        .merge(
            Router::new()
                .route("/results/{sessionId}", get(interview::get_result))
                .layer(admin_guard.clone()),
        );

    let admin_routes = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/questions/{role}", get(admin::get_full_questions))
        .route("/export-results", get(admin::export_results))
        .route("/export-questions/{role}", get(admin::export_questions))
        .layer(admin_guard);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/interview", interview_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
