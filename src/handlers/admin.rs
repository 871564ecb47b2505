// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        question::{Question, role_slug},
        result::{DashboardStatistics, InterviewResult},
        session::{Session, SessionStatus},
    },
    store::{QuestionBank, ResultStore, SessionStore},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub active_sessions: Vec<Session>,
    pub completed_results: Vec<InterviewResult>,
    pub statistics: DashboardStatistics,
}

fn statistics(sessions: &[Session], results: &[InterviewResult]) -> DashboardStatistics {
    let completed_sessions = sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Completed)
        .count();
    let passed_candidates = results.iter().filter(|r| r.is_passed).count();

    DashboardStatistics {
        total_sessions: sessions.len(),
        completed_sessions,
        pending_sessions: sessions.len() - completed_sessions,
        passed_candidates,
        failed_candidates: results.len() - passed_candidates,
    }
}

/// Sessions, stored results and aggregate counts.
/// Admin only.
pub async fn dashboard(
    State(sessions): State<Arc<dyn SessionStore>>,
    State(results): State<ResultStore>,
) -> Result<impl IntoResponse, AppError> {
    let active_sessions = sessions.list().await?;
    let completed_results = results.list().await?;
    let statistics = statistics(&active_sessions, &completed_results);

    Ok(Json(DashboardResponse {
        active_sessions,
        completed_results,
        statistics,
    }))
}

/// Answer-bearing question set for a role.
/// Admin only.
pub async fn get_full_questions(
    State(questions): State<QuestionBank>,
    Path(role): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(questions.load(&role).await?))
}

/// All stored results as CSV.
/// Admin only.
pub async fn export_results(State(results): State<ResultStore>) -> Result<Response, AppError> {
    let results = results.list().await?;
    let body = results_csv(&results)?;

    tracing::info!("Exported {} interview results", results.len());

    Ok(csv_attachment("interview-results.csv", body))
}

/// A role's question set as CSV.
/// Admin only.
pub async fn export_questions(
    State(questions): State<QuestionBank>,
    Path(role): Path<String>,
) -> Result<Response, AppError> {
    let questions = questions.load(&role).await?;
    let body = questions_csv(&questions)?;

    Ok(csv_attachment(
        &format!("{}-questions.csv", role_slug(&role)),
        body,
    ))
}

fn results_csv(results: &[InterviewResult]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "Candidate Name",
            "Email",
            "Role",
            "Score (%)",
            "Correct Answers",
            "Total Questions",
            "Result",
            "Completed At",
            "Recording File",
        ])
        .map_err(csv_error)?;

    for result in results {
        writer
            .write_record([
                result.candidate_name.clone(),
                result.candidate_email.clone(),
                result.role.clone(),
                format!("{:.1}", result.score),
                result.correct_answers.to_string(),
                result.total_questions.to_string(),
                if result.is_passed { "PASSED" } else { "FAILED" }.to_string(),
                result.completed_at.to_rfc3339(),
                result.recording_file.clone().unwrap_or_else(|| "N/A".to_string()),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

fn questions_csv(questions: &[Question]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "Question #",
            "Question",
            "Type",
            "Options",
            "Correct Answer",
            "Time Limit (seconds)",
            "Difficulty",
        ])
        .map_err(csv_error)?;

    for (index, question) in questions.iter().enumerate() {
        writer
            .write_record([
                (index + 1).to_string(),
                question.question.clone(),
                question.question_type.as_str().to_string(),
                question
                    .options
                    .as_ref()
                    .map(|o| o.join(" | "))
                    .unwrap_or_default(),
                question.correct_answer.clone(),
                question.time_limit.to_string(),
                question.difficulty.clone(),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

fn csv_error(err: csv::Error) -> AppError {
    tracing::error!("CSV export failed: {:?}", err);
    AppError::InternalServerError(err.to_string())
}

fn csv_attachment(filename: &str, body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{QuestionId, QuestionType};
    use chrono::Utc;

    fn result(session_id: &str, is_passed: bool) -> InterviewResult {
        InterviewResult {
            session_id: session_id.to_string(),
            candidate_name: "Jane, Doe".to_string(),
            candidate_email: "jane@example.com".to_string(),
            role: "quality-analyst".to_string(),
            score: if is_passed { 90.0 } else { 10.0 },
            total_questions: 10,
            correct_answers: if is_passed { 9 } else { 1 },
            is_passed,
            completed_at: Utc::now(),
            detailed_results: vec![],
            recording_file: None,
            transcript: String::new(),
        }
    }

    #[test]
    fn statistics_count_sessions_and_outcomes() {
        let now = Utc::now();
        let mut done = Session::new(
            "a".into(),
            "A".into(),
            "a@example.com".into(),
            "qa".into(),
            "t".into(),
            now,
            now,
        );
        done.status = SessionStatus::Completed;
        let pending = Session::new(
            "b".into(),
            "B".into(),
            "b@example.com".into(),
            "qa".into(),
            "t".into(),
            now,
            now,
        );

        let stats = statistics(&[done, pending], &[result("a", true), result("c", false)]);
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.completed_sessions, 1);
        assert_eq!(stats.pending_sessions, 1);
        assert_eq!(stats.passed_candidates, 1);
        assert_eq!(stats.failed_candidates, 1);
    }

    #[test]
    fn results_csv_quotes_fields() {
        let body = String::from_utf8(results_csv(&[result("a", true)]).unwrap()).unwrap();
        let mut lines = body.lines();

        assert!(lines.next().unwrap().starts_with("Candidate Name,Email,Role,Score (%)"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("\"Jane, Doe\",jane@example.com,quality-analyst,90.0,9,10,PASSED,"));
        assert!(row.ends_with(",N/A"));
    }

    #[test]
    fn questions_csv_joins_options() {
        let question = Question {
            id: QuestionId::Number(1),
            question: "Pick one".to_string(),
            question_type: QuestionType::MultipleChoice,
            options: Some(vec!["A".to_string(), "B".to_string()]),
            correct_answer: "A".to_string(),
            time_limit: 90,
            difficulty: "Easy".to_string(),
        };

        let body = String::from_utf8(questions_csv(&[question]).unwrap()).unwrap();
        assert!(body.contains("1,Pick one,multiple-choice,A | B,A,90,Easy"));
    }
}
