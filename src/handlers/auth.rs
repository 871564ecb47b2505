// src/handlers/auth.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use url::Url;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::{Config, DEFAULT_LINK_DURATION_MINUTES},
    error::AppError,
    models::session::{GenerateLinkRequest, GenerateLinkResponse, Session, ValidateTokenResponse},
    notify::templates::invitation_email,
    state::AppState,
    store::SessionStore,
    utils::jwt::{sign_interview_token, verify_interview_token},
};

/// Issues a time-limited interview link for a candidate.
///
/// * Fails before creating anything if `APP_URL` or `JWT_SECRET` is missing.
/// * Signs a token expiring with the session, then stores the pending session.
/// * Queues the invitation email; delivery never affects the response.
pub async fn generate_link(
    State(state): State<AppState>,
    payload: Result<Json<GenerateLinkRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let app_url = state.config.require_app_url()?;
    let secret = state.config.require_secret()?;

    let duration = payload.duration.unwrap_or(DEFAULT_LINK_DURATION_MINUTES);
    let session_id = Uuid::new_v4().to_string();
    let created_at = Utc::now();
    let expires_at = created_at + Duration::minutes(duration);

    let token = sign_interview_token(
        &session_id,
        &payload.candidate_email,
        &payload.candidate_name,
        &payload.role,
        expires_at,
        secret,
    )?;

    let interview_link = interview_link(app_url, &token)?;

    state
        .sessions
        .create(Session::new(
            session_id.clone(),
            payload.candidate_name.clone(),
            payload.candidate_email.clone(),
            payload.role.clone(),
            token,
            expires_at,
            created_at,
        ))
        .await?;

    tracing::info!(
        session_id = %session_id,
        role = %payload.role,
        "Generated interview link for {}",
        payload.candidate_email
    );

    let email_attempted = state.notifier.enqueue(invitation_email(
        &payload.candidate_email,
        &payload.candidate_name,
        &payload.role,
        duration,
        expires_at,
        &interview_link,
    ));

    Ok(Json(GenerateLinkResponse {
        success: true,
        session_id,
        interview_link,
        expires_at,
        // Delivery is asynchronous, so success is never known here.
        email_sent: false,
        email_attempted,
    }))
}

/// `{APP_URL}/interview?token=...`
fn interview_link(app_url: &str, token: &str) -> Result<String, AppError> {
    let mut url = Url::parse(app_url)
        .map_err(|e| AppError::InternalServerError(format!("Invalid APP_URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| AppError::InternalServerError("APP_URL cannot be a base".to_string()))?
        .pop_if_empty()
        .push("interview");
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.into())
}

#[derive(Debug, Deserialize)]
pub struct ValidateTokenParams {
    pub token: Option<String>,
}

/// Checks an interview token against the session store.
///
/// A correctly signed token is still rejected once its session is completed
/// or past its expiry.
pub async fn validate_token(
    State(sessions): State<Arc<dyn SessionStore>>,
    State(config): State<Config>,
    Query(params): Query<ValidateTokenParams>,
) -> Result<impl IntoResponse, AppError> {
    let token = params
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Token is required".to_string()))?;

    let claims = verify_interview_token(&token, config.require_secret()?)?;

    let session = sessions
        .get(&claims.session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    if session.is_completed() {
        return Err(AppError::already_completed());
    }

    if session.is_expired_at(Utc::now()) {
        return Err(AppError::BadRequest("Interview link has expired".to_string()));
    }

    Ok(Json(ValidateTokenResponse {
        valid: true,
        candidate_name: claims.candidate_name,
        role: claims.role,
        session_id: claims.session_id,
    }))
}

/// Lists all sessions, pending and completed.
/// Admin only.
pub async fn list_sessions(
    State(sessions): State<Arc<dyn SessionStore>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.list().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_is_built_from_base_url() {
        assert_eq!(
            interview_link("https://hire.example.com", "a.b.c").unwrap(),
            "https://hire.example.com/interview?token=a.b.c"
        );
        assert_eq!(
            interview_link("https://hire.example.com/portal", "t").unwrap(),
            "https://hire.example.com/portal/interview?token=t"
        );
    }

    #[test]
    fn bad_base_url_is_an_internal_error() {
        assert!(matches!(
            interview_link("not a url", "t"),
            Err(AppError::InternalServerError(_))
        ));
    }
}
