// src/handlers/interview.rs

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::{
    config::{DOWNLOAD_LINK_TTL_HOURS, MAX_ATTACHMENT_BYTES, MAX_RECORDING_BYTES, PASSING_SCORE_PERCENTAGE},
    error::AppError,
    models::{
        question::Question,
        result::{CandidateResponse, InterviewResult, NO_ANSWER, QuestionOutcome},
        session::{Completion, SessionPatch},
        telemetry::TelemetryEvent,
    },
    notify::{Attachment, templates::result_email},
    state::AppState,
    store::{QuestionBank, RecordingStore, ResultStore},
    utils::{
        jwt::verify_interview_token,
        signing::{recording_download_url, verify_recording_grant},
    },
};

/// Returns a role's question set without answer keys.
pub async fn get_questions(
    State(questions): State<QuestionBank>,
    Path(role): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(questions.load_public(&role).await?))
}

/// Outcome of grading a response list against a question set.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub correct_answers: usize,
    pub total_questions: usize,
    /// Percentage, unrounded.
    pub score: f64,
    pub is_passed: bool,
    pub outcomes: Vec<QuestionOutcome>,
}

/// Grades responses by position: `responses[i]` answers `questions[i]`.
///
/// Answers match only on exact string equality. Missing or null responses
/// count as wrong and are reported as "No answer". An empty question set
/// scores 0.
pub fn grade_responses(questions: &[Question], responses: &[Option<CandidateResponse>]) -> Grade {
    let mut correct_answers = 0;
    let mut outcomes = Vec::with_capacity(questions.len());

    for (index, question) in questions.iter().enumerate() {
        let response = responses.get(index).and_then(Option::as_ref);
        let answer = response.and_then(|r| r.answer.as_deref());

        let is_correct = answer == Some(question.correct_answer.as_str());
        if is_correct {
            correct_answers += 1;
        }

        outcomes.push(QuestionOutcome {
            question_id: question.id.clone(),
            question: question.question.clone(),
            user_answer: answer
                .filter(|a| !a.is_empty())
                .unwrap_or(NO_ANSWER)
                .to_string(),
            correct_answer: question.correct_answer.clone(),
            is_correct,
            time_taken: response.map(|r| r.time_taken).unwrap_or(0),
        });
    }

    let total_questions = questions.len();
    let score = if total_questions == 0 {
        0.0
    } else {
        (correct_answers as f64 / total_questions as f64) * 100.0
    };

    Grade {
        correct_answers,
        total_questions,
        score,
        is_passed: total_questions > 0 && score >= PASSING_SCORE_PERCENTAGE,
        outcomes,
    }
}

/// Multipart fields of a submission.
#[derive(Debug, Default)]
struct SubmissionForm {
    session_id: Option<String>,
    token: Option<String>,
    responses: Option<String>,
    transcript: Option<String>,
    /// Stored filename of the uploaded recording.
    recording_file: Option<String>,
}

/// Reads the multipart body, streaming any recording straight to disk.
async fn read_submission_form(
    recordings: &RecordingStore,
    mut multipart: Multipart,
) -> Result<SubmissionForm, AppError> {
    let mut form = SubmissionForm::default();

    let outcome: Result<(), AppError> = async {
        while let Some(mut field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "sessionId" => form.session_id = Some(field.text().await?),
                "token" => form.token = Some(field.text().await?),
                "responses" => form.responses = Some(field.text().await?),
                "transcript" => form.transcript = Some(field.text().await?),
                "recording" => {
                    if form.recording_file.is_some() {
                        return Err(AppError::BadRequest("Only one recording is accepted".to_string()));
                    }

                    let (filename, mut file) = recordings.create(field.file_name()).await?;
                    form.recording_file = Some(filename);

                    let mut written = 0usize;
                    while let Some(chunk) = field.chunk().await? {
                        written += chunk.len();
                        if written > MAX_RECORDING_BYTES {
                            return Err(AppError::PayloadTooLarge(
                                "Recording exceeds the 100MB limit".to_string(),
                            ));
                        }
                        file.write_all(&chunk).await?;
                    }
                    file.flush().await?;

                    if written == 0 {
                        if let Some(empty) = form.recording_file.take() {
                            recordings.remove(&empty).await;
                        }
                    }
                }
                other => tracing::debug!("Ignoring unexpected multipart field: {}", other),
            }
        }
        Ok(())
    }
    .await;

    match outcome {
        Ok(()) => Ok(form),
        Err(e) => {
            if let Some(file) = &form.recording_file {
                recordings.remove(file).await;
            }
            Err(e)
        }
    }
}

/// Submits a candidate's interview.
///
/// * Verifies the token, then that the session exists and is still pending.
/// * Grades responses against the authoritative question set.
/// * Completes the session (the store rejects a second completion).
/// * Writes the result file and queues the recruiter email.
///
/// Until the session is completed, any failure discards the uploaded recording.
pub async fn submit_interview(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_submission_form(&state.recordings, multipart).await?;

    let (session_id, completion, result) = match prepare_submission(&state, &form).await {
        Ok(prepared) => prepared,
        Err(e) => {
            discard_recording(&state.recordings, &form).await;
            return Err(e);
        }
    };

    // Point of no return: only one submission per session gets past this.
    if let Err(e) = state
        .sessions
        .mutate(&session_id, SessionPatch::Complete(completion))
        .await
    {
        tracing::warn!(session_id = %session_id, "Submission rejected at completion: {}", e);
        discard_recording(&state.recordings, &form).await;
        return Err(e);
    }

    state.results.save(&result).await.map_err(|e| {
        tracing::error!(session_id = %session_id, "Failed to persist result: {}", e);
        e
    })?;

    tracing::info!(
        session_id = %session_id,
        score = result.score,
        passed = result.is_passed,
        recording = ?result.recording_file,
        "Interview submitted"
    );

    notify_recruiter(&state, &result).await;

    Ok(Json(json!({
        "success": true,
        "message": "Interview submitted successfully. Results have been sent to the recruitment team.",
        "sessionId": session_id,
    })))
}

/// Runs every precondition and grades the submission without mutating anything.
async fn prepare_submission(
    state: &AppState,
    form: &SubmissionForm,
) -> Result<(String, Completion, InterviewResult), AppError> {
    let (Some(session_id), Some(token)) = (form.session_id.as_deref(), form.token.as_deref())
    else {
        return Err(AppError::BadRequest("Missing required fields".to_string()));
    };

    let claims = verify_interview_token(token, state.config.require_secret()?)?;
    if claims.session_id != session_id {
        tracing::warn!(session_id, "Token does not belong to the submitted session");
        return Err(AppError::invalid_token());
    }

    let session = state
        .sessions
        .get(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    if session.is_completed() {
        return Err(AppError::already_completed());
    }

    let responses: Vec<Option<CandidateResponse>> =
        serde_json::from_str(form.responses.as_deref().unwrap_or_default()).map_err(|_| {
            AppError::BadRequest("responses must be a JSON array".to_string())
        })?;

    let questions = state.questions.load(&session.role).await?;
    let grade = grade_responses(&questions, &responses);
    let completed_at = Utc::now();

    let completion = Completion {
        completed_at,
        score: grade.score,
        responses,
        detailed_results: grade.outcomes.clone(),
        recording_file: form.recording_file.clone(),
    };

    let result = InterviewResult {
        session_id: session_id.to_string(),
        candidate_name: session.candidate_name,
        candidate_email: session.candidate_email,
        role: session.role,
        score: grade.score,
        total_questions: grade.total_questions,
        correct_answers: grade.correct_answers,
        is_passed: grade.is_passed,
        completed_at,
        detailed_results: grade.outcomes,
        recording_file: form.recording_file.clone(),
        transcript: form.transcript.clone().unwrap_or_default(),
    };

    Ok((session_id.to_string(), completion, result))
}

async fn discard_recording(recordings: &RecordingStore, form: &SubmissionForm) {
    if let Some(file) = &form.recording_file {
        recordings.remove(file).await;
    }
}

/// Queues the result email for the recruiter. Never fails the caller.
async fn notify_recruiter(state: &AppState, result: &InterviewResult) {
    let Some(recruiter) = state.config.recruiter_email.as_deref() else {
        tracing::warn!(session_id = %result.session_id, "RECRUITER_EMAIL not set; skipping result email");
        return;
    };

    let mut download_url = None;
    let mut attachment = None;

    if let Some(file) = &result.recording_file {
        if let (Ok(app_url), Ok(secret)) = (state.config.require_app_url(), state.config.require_secret()) {
            let expires = (Utc::now() + Duration::hours(DOWNLOAD_LINK_TTL_HOURS)).timestamp_millis();
            match recording_download_url(app_url, &result.session_id, file, expires, secret) {
                Ok(url) => download_url = Some(url),
                Err(e) => tracing::warn!("Could not build recording link: {}", e),
            }
        }

        match state.recordings.size(file).await {
            Ok(Some(size)) if size <= MAX_ATTACHMENT_BYTES => {
                if let Ok(path) = state.recordings.resolve(file) {
                    attachment = Some(Attachment {
                        filename: file.clone(),
                        content_type: "video/webm".to_string(),
                        path,
                    });
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Could not stat recording for email: {}", e),
        }
    }

    state.notifier.enqueue(result_email(
        recruiter,
        result,
        download_url.as_deref(),
        attachment,
    ));
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub file: Option<String>,
    pub expires: Option<String>,
    pub sig: Option<String>,
}

/// Streams a recording to whoever holds a valid signed link.
pub async fn download_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, AppError> {
    let (Some(file), Some(expires), Some(sig)) = (params.file, params.expires, params.sig) else {
        return Err(AppError::BadRequest("Missing parameters".to_string()));
    };

    let expires: i64 = expires
        .parse()
        .map_err(|_| AppError::Forbidden("Invalid or expired download link".to_string()))?;

    verify_recording_grant(
        &session_id,
        &file,
        expires,
        &sig,
        state.config.require_secret()?,
        Utc::now().timestamp_millis(),
    )?;

    if state.recordings.size(&file).await?.is_none() {
        return Err(AppError::NotFound("File not found".to_string()));
    }

    let handle = tokio::fs::File::open(state.recordings.resolve(&file)?).await?;
    let body = Body::from_stream(ReaderStream::new(handle));

    tracing::info!(session_id = %session_id, file = %file, "Recording downloaded");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type_for(&file).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file),
            ),
        ],
        body,
    )
        .into_response())
}

fn content_type_for(file: &str) -> &'static str {
    match file.rsplit('.').next() {
        Some("webm") => "video/webm",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// Returns the stored result for a session.
/// Admin only.
pub async fn get_result(
    State(results): State<ResultStore>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = results
        .load(&session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Results not found".to_string()))?;

    Ok(Json(result))
}

/// Logs a proctoring signal from the candidate runtime.
pub async fn report_telemetry(Json(event): Json<TelemetryEvent>) -> impl IntoResponse {
    tracing::warn!(
        session_id = %event.session_id,
        kind = ?event.kind,
        count = event.count,
        detail = ?event.detail,
        "Proctoring event reported"
    );

    StatusCode::ACCEPTED
}
