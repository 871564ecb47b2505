// src/models/session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::result::{CandidateResponse, QuestionOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(SessionStatus::Pending),
            "completed" => Some(SessionStatus::Completed),
            _ => None,
        }
    }
}

/// One issued interview.
///
/// `expires_at` is fixed at creation. Status only ever moves
/// pending -> completed, and the completion fields are set in the same step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub candidate_name: String,
    pub candidate_email: String,
    pub role: String,
    /// Skipped during serialization so admin listings never leak live tokens.
    #[serde(skip_serializing)]
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub score: Option<f64>,
    pub responses: Option<Vec<Option<CandidateResponse>>>,
    pub detailed_results: Option<Vec<QuestionOutcome>>,
    pub recording_file: Option<String>,
}

impl Session {
    pub fn new(
        session_id: String,
        candidate_name: String,
        candidate_email: String,
        role: String,
        token: String,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Session {
            session_id,
            candidate_name,
            candidate_email,
            role,
            token,
            expires_at,
            status: SessionStatus::Pending,
            created_at,
            completed_at: None,
            score: None,
            responses: None,
            detailed_results: None,
            recording_file: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Fields written when a session completes.
#[derive(Debug, Clone)]
pub struct Completion {
    pub completed_at: DateTime<Utc>,
    pub score: f64,
    pub responses: Vec<Option<CandidateResponse>>,
    pub detailed_results: Vec<QuestionOutcome>,
    pub recording_file: Option<String>,
}

/// A mutation applied atomically by a session store.
#[derive(Debug, Clone)]
pub enum SessionPatch {
    /// pending -> completed; rejected if the session is already completed.
    Complete(Completion),
}

/// DTO for issuing an interview link.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateLinkRequest {
    #[validate(email(message = "candidateEmail must be a valid email address."))]
    pub candidate_email: String,
    #[validate(length(min = 1, max = 200, message = "candidateName is required."))]
    pub candidate_name: String,
    #[validate(length(min = 1, max = 200, message = "role is required."))]
    pub role: String,
    /// Link validity in minutes.
    #[validate(range(min = 1, max = 10080))]
    pub duration: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateLinkResponse {
    pub success: bool,
    pub session_id: String,
    pub interview_link: String,
    pub expires_at: DateTime<Utc>,
    pub email_sent: bool,
    pub email_attempted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTokenResponse {
    pub valid: bool,
    pub candidate_name: String,
    pub role: String,
    pub session_id: String,
}
