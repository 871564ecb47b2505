// src/models/result.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::question::QuestionId;

/// Literal stored as the user answer when a question was left unanswered.
pub const NO_ANSWER: &str = "No answer";

/// One candidate answer, aligned by index with the question set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResponse {
    #[serde(default)]
    pub question_id: Option<QuestionId>,
    /// `None` means unanswered.
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub time_taken: u64,
}

/// Grading of a single question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub time_taken: u64,
}

/// Persisted outcome of one completed interview. Written once per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewResult {
    pub session_id: String,
    pub candidate_name: String,
    pub candidate_email: String,
    pub role: String,
    pub score: f64,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub is_passed: bool,
    pub completed_at: DateTime<Utc>,
    pub detailed_results: Vec<QuestionOutcome>,
    pub recording_file: Option<String>,
    #[serde(default)]
    pub transcript: String,
}

/// Aggregate numbers shown on the admin dashboard.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatistics {
    pub total_sessions: usize,
    pub completed_sessions: usize,
    pub pending_sessions: usize,
    pub passed_candidates: usize,
    pub failed_candidates: usize,
}
