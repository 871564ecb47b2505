// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{config::Config, error::AppError};

/// Interview token claims.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InterviewClaims {
    pub session_id: String,
    pub candidate_email: String,
    pub candidate_name: String,
    pub role: String,
    /// Session expiry in epoch milliseconds.
    pub expires_at: i64,
    /// Standard expiration claim (epoch seconds), same instant as `expires_at`.
    pub exp: i64,
}

/// Signs an interview token for a session.
///
/// The `exp` claim is derived from `expires_at`, so the token and the stored
/// session expire at the same instant.
pub fn sign_interview_token(
    session_id: &str,
    candidate_email: &str,
    candidate_name: &str,
    role: &str,
    expires_at: DateTime<Utc>,
    secret: &str,
) -> Result<String, AppError> {
    let claims = InterviewClaims {
        session_id: session_id.to_owned(),
        candidate_email: candidate_email.to_owned(),
        candidate_name: candidate_name.to_owned(),
        role: role.to_owned(),
        expires_at: expires_at.timestamp_millis(),
        exp: expires_at.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes an interview token.
///
/// Bad signatures, malformed tokens and elapsed expiry all collapse into the
/// same `AuthError` so callers cannot tell which check failed.
pub fn verify_interview_token(token: &str, secret: &str) -> Result<InterviewClaims, AppError> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    let token_data = decode::<InterviewClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("Interview token rejected: {}", e);
        AppError::invalid_token()
    })?;

    Ok(token_data.claims)
}

/// Axum Middleware: Admin Authorization.
///
/// When `ADMIN_API_KEY` is configured, requires `Authorization: Bearer <key>`.
/// Without a configured key the admin surface is open.
pub async fn admin_middleware(
    State(config): State<Config>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = config.admin_api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(key) if admin_key_matches(key, expected) => {
            Ok(next.run(req).await)
        }
        Some(_) => Err(StatusCode::FORBIDDEN),
        None => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Constant-time over fixed-size digests, whatever the key lengths.
fn admin_key_matches(provided: &str, expected: &str) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided.as_slice().ct_eq(expected.as_slice()).into()
}
