use std::fmt::Write;

use chrono::{DateTime, Utc};

use super::{Attachment, Email};
use crate::{models::result::InterviewResult, utils::html::escape_text};

const PASS_COLOR: &str = "#28a745";
const FAIL_COLOR: &str = "#dc3545";

/// Invitation sent to the candidate with the interview link.
pub fn invitation_email(
    candidate_email: &str,
    candidate_name: &str,
    role: &str,
    duration_minutes: i64,
    expires_at: DateTime<Utc>,
    interview_link: &str,
) -> Email {
    let role_html = escape_text(role);
    let expires = expires_at.format("%Y-%m-%d %H:%M UTC");

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #333;">Interview Invitation</h2>
  <p>Dear {name},</p>
  <p>You have been invited to participate in a video interview for the <strong>{role}</strong> position.</p>
  <div style="background-color: #f8f9fa; padding: 20px; border-radius: 5px; margin: 20px 0;">
    <h3 style="color: #007bff;">Interview Details:</h3>
    <ul>
      <li><strong>Position:</strong> {role}</li>
      <li><strong>Duration:</strong> {duration} minutes</li>
      <li><strong>Expires:</strong> {expires}</li>
    </ul>
  </div>
  <div style="text-align: center; margin: 30px 0;">
    <a href="{link}" style="background-color: #007bff; color: white; padding: 15px 30px; text-decoration: none; border-radius: 5px; display: inline-block;">Start Interview</a>
  </div>
  <p style="color: #666; font-size: 12px;">This link will expire on {expires}. If you have any technical issues, please contact the recruitment team.</p>
</div>"#,
        name = escape_text(candidate_name),
        role = role_html,
        duration = duration_minutes,
        expires = expires,
        link = interview_link,
    );

    Email {
        to: candidate_email.to_string(),
        subject: format!("Interview Invitation - {} Position", role),
        html,
        attachment: None,
    }
}

/// Result summary sent to the recruiter.
pub fn result_email(
    recruiter_email: &str,
    result: &InterviewResult,
    download_url: Option<&str>,
    attachment: Option<Attachment>,
) -> Email {
    let (status, color) = if result.is_passed {
        ("SUCCESSFUL", PASS_COLOR)
    } else {
        ("UNSUCCESSFUL", FAIL_COLOR)
    };

    let mut rows = String::new();
    for (index, outcome) in result.detailed_results.iter().enumerate() {
        let (mark, mark_color) = if outcome.is_correct {
            ("&#10003;", PASS_COLOR)
        } else {
            ("&#10007;", FAIL_COLOR)
        };
        let _ = write!(
            rows,
            r#"<tr style="border-bottom: 1px solid #ddd;"><td style="padding: 10px;">{}</td><td style="padding: 10px;">{}</td><td style="padding: 10px;">{}</td><td style="padding: 10px;">{}</td><td style="padding: 10px; color: {};">{}</td><td style="padding: 10px;">{}s</td></tr>"#,
            index + 1,
            escape_text(&outcome.question),
            escape_text(&outcome.user_answer),
            escape_text(&outcome.correct_answer),
            mark_color,
            mark,
            outcome.time_taken,
        );
    }

    let recording_section = match (&result.recording_file, download_url) {
        (Some(file), Some(url)) => format!(
            r#"<div style="margin-top: 20px; padding: 15px; background-color: #e7f3ff; border-radius: 5px;"><p><strong>Recording File:</strong> {}</p><p><a href="{}">Download recording (available for 24 hours)</a></p></div>"#,
            escape_text(file),
            url
        ),
        (Some(file), None) => format!(
            r#"<div style="margin-top: 20px; padding: 15px; background-color: #e7f3ff; border-radius: 5px;"><p><strong>Recording File:</strong> {}</p></div>"#,
            escape_text(file)
        ),
        _ => String::new(),
    };

    let transcript_section = if result.transcript.trim().is_empty() {
        String::new()
    } else {
        format!(
            r#"<div style="margin-top: 20px; padding: 15px; background-color: #fff3cd; border-radius: 5px;"><h3>Transcript</h3><pre style="white-space: pre-wrap; font-family: inherit;">{}</pre></div>"#,
            escape_text(&result.transcript)
        )
    };

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto;">
  <div style="background-color: {color}; color: white; padding: 20px; text-align: center;"><h1>Interview Result: {status}</h1></div>
  <div style="padding: 20px;">
    <h2>Candidate Information</h2>
    <table style="width: 100%; border-collapse: collapse; margin-bottom: 20px;">
      <tr><td style="padding: 8px; font-weight: bold;">Name:</td><td style="padding: 8px;">{name}</td></tr>
      <tr><td style="padding: 8px; font-weight: bold;">Email:</td><td style="padding: 8px;">{email}</td></tr>
      <tr><td style="padding: 8px; font-weight: bold;">Role:</td><td style="padding: 8px;">{role}</td></tr>
      <tr><td style="padding: 8px; font-weight: bold;">Completed At:</td><td style="padding: 8px;">{completed}</td></tr>
    </table>
    <h2>Score Summary</h2>
    <div style="background-color: #f8f9fa; padding: 15px; border-radius: 5px; margin-bottom: 20px;">
      <p><strong>Overall Score:</strong> {score:.1}%</p>
      <p><strong>Correct Answers:</strong> {correct} out of {total}</p>
      <p><strong>Result:</strong> <span style="color: {color}; font-weight: bold;">{status}</span></p>
    </div>
    <h2>Detailed Results</h2>
    <table style="width: 100%; border-collapse: collapse; border: 1px solid #ddd;">
      <thead><tr style="background-color: #f8f9fa;"><th>#</th><th>Question</th><th>User Answer</th><th>Correct Answer</th><th>Result</th><th>Time</th></tr></thead>
      <tbody>{rows}</tbody>
    </table>
    {recording_section}
    {transcript_section}
  </div>
</div>"#,
        color = color,
        status = status,
        name = escape_text(&result.candidate_name),
        email = escape_text(&result.candidate_email),
        role = escape_text(&result.role),
        completed = result.completed_at.format("%Y-%m-%d %H:%M:%S UTC"),
        score = result.score,
        correct = result.correct_answers,
        total = result.total_questions,
        rows = rows,
        recording_section = recording_section,
        transcript_section = transcript_section,
    );

    Email {
        to: recruiter_email.to_string(),
        subject: format!("Interview Result - {} - {}", status, result.candidate_name),
        html,
        attachment,
    }
}
