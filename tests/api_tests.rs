// tests/api_tests.rs

mod common;

use common::{ADMIN_KEY, TestApp, responses_json, spawn_app, spawn_app_with};
use interview_backend::{config::MAX_RECORDING_BYTES, models::session::SessionStatus};
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

fn submission(session_id: &str, token: &str, correct: usize) -> Form {
    Form::new()
        .text("sessionId", session_id.to_string())
        .text("token", token.to_string())
        .text("responses", responses_json(correct))
        .text("transcript", "hello from the candidate")
}

async fn submit(app: &TestApp, form: Form) -> reqwest::Response {
    app.client
        .post(app.url("/api/interview/submit"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request")
}

fn token_of(link: &Value) -> String {
    let url = url::Url::parse(link["interviewLink"].as_str().unwrap()).unwrap();
    url.query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .unwrap()
}

#[tokio::test]
async fn health_check_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn interview_end_to_end() {
    let app = spawn_app().await;

    // 1. Issue link
    let link = app.generate_link("Jane Doe", "quality-analyst").await;
    assert_eq!(link["success"], true);
    assert_eq!(link["emailSent"], false);
    // No provider configured in tests
    assert_eq!(link["emailAttempted"], false);
    let session_id = link["sessionId"].as_str().unwrap().to_string();
    let token = token_of(&link);
    assert!(link["interviewLink"].as_str().unwrap().starts_with("http://127.0.0.1:3000/interview?token="));

    // 2. Validate
    let response = app
        .client
        .get(app.url("/api/auth/validate-token"))
        .query(&[("token", token.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let validated: Value = response.json().await.unwrap();
    assert_eq!(validated["valid"], true);
    assert_eq!(validated["role"], "quality-analyst");
    assert_eq!(validated["candidateName"], "Jane Doe");
    assert_eq!(validated["sessionId"], session_id.as_str());

    let session = app.state.sessions.get(&session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Pending);
    assert_eq!(session.candidate_email, "jane@example.com");
    assert_eq!(session.role, "quality-analyst");

    // 3. Questions without answer keys
    let response = app
        .client
        .get(app.url("/api/interview/questions/quality-analyst"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let questions: Vec<Value> = response.json().await.unwrap();
    assert_eq!(questions.len(), 10);
    for question in &questions {
        assert!(question.get("correctAnswer").is_none());
        assert!(question.get("difficulty").is_none());
        assert!(question.get("timeLimit").is_some());
    }

    // 4. Submit all correct with a recording
    let form = submission(&session_id, &token, 10).part(
        "recording",
        Part::bytes(vec![0x1a, 0x45, 0xdf, 0xa3])
            .file_name(format!("interview-{}.webm", session_id))
            .mime_str("video/webm")
            .unwrap(),
    );
    let response = submit(&app, form).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["sessionId"], session_id.as_str());

    // 5. Result persisted under the session id
    let result_path = app
        .state
        .config
        .results_path
        .join(format!("{}.json", session_id));
    assert!(result_path.exists());

    let result = app.state.results.load(&session_id).await.unwrap().unwrap();
    assert_eq!(result.score, 100.0);
    assert!(result.is_passed);
    assert_eq!(result.correct_answers, 10);
    assert_eq!(result.transcript, "hello from the candidate");

    let recording = result.recording_file.expect("recording stored");
    assert!(recording.ends_with(&format!("-interview-{}.webm", session_id)));
    assert_eq!(app.state.recordings.size(&recording).await.unwrap(), Some(4));

    let session = app.state.sessions.get(&session_id).await.unwrap().unwrap();
    assert!(session.is_completed());
    assert_eq!(session.score, Some(100.0));
}

#[tokio::test]
async fn second_submission_is_rejected() {
    let app = spawn_app().await;
    let link = app.generate_link("Jane Doe", "quality-analyst").await;
    let session_id = link["sessionId"].as_str().unwrap().to_string();
    let token = token_of(&link);

    let first = submit(&app, submission(&session_id, &token, 10)).await;
    assert_eq!(first.status().as_u16(), 200);

    let second = submit(&app, submission(&session_id, &token, 0)).await;
    assert_eq!(second.status().as_u16(), 400);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["error"], "Interview already completed");

    let result = app.state.results.load(&session_id).await.unwrap().unwrap();
    assert_eq!(result.score, 100.0);

    // A completed session's token no longer validates
    let response = app
        .client
        .get(app.url("/api/auth/validate-token"))
        .query(&[("token", token.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn concurrent_submissions_complete_once() {
    let app = spawn_app().await;
    let link = app.generate_link("Jane Doe", "quality-analyst").await;
    let session_id = link["sessionId"].as_str().unwrap().to_string();
    let token = token_of(&link);

    let (a, b) = tokio::join!(
        submit(&app, submission(&session_id, &token, 10)),
        submit(&app, submission(&session_id, &token, 3))
    );

    let mut statuses = [a.status().as_u16(), b.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, [200, 400]);
}

#[tokio::test]
async fn score_and_pass_threshold() {
    let app = spawn_app().await;

    for (correct, passed) in [(6, false), (7, true)] {
        let link = app.generate_link("Jane Doe", "quality-analyst").await;
        let session_id = link["sessionId"].as_str().unwrap().to_string();
        let token = token_of(&link);

        let response = submit(&app, submission(&session_id, &token, correct)).await;
        assert_eq!(response.status().as_u16(), 200);

        let result = app.state.results.load(&session_id).await.unwrap().unwrap();
        assert_eq!(result.score, correct as f64 * 10.0);
        assert_eq!(result.is_passed, passed);
        assert_eq!(result.detailed_results.len(), 10);
    }
}

#[tokio::test]
async fn short_response_array_scores_missing_as_unanswered() {
    let app = spawn_app().await;
    let link = app.generate_link("Jane Doe", "quality-analyst").await;
    let session_id = link["sessionId"].as_str().unwrap().to_string();
    let token = token_of(&link);

    let form = Form::new()
        .text("sessionId", session_id.clone())
        .text("token", token)
        .text("responses", json!([{"answer": "answer-1", "timeTaken": 3}, null]).to_string());
    let response = submit(&app, form).await;
    assert_eq!(response.status().as_u16(), 200);

    let result = app.state.results.load(&session_id).await.unwrap().unwrap();
    assert_eq!(result.correct_answers, 1);
    assert_eq!(result.detailed_results[1].user_answer, "No answer");
    assert_eq!(result.detailed_results[9].user_answer, "No answer");
    assert!(result.recording_file.is_none());
}

#[tokio::test]
async fn submission_requires_matching_token() {
    let app = spawn_app().await;
    let first = app.generate_link("Jane Doe", "quality-analyst").await;
    let second = app.generate_link("John Roe", "quality-analyst").await;

    // Token of one session used for another
    let response = submit(
        &app,
        submission(second["sessionId"].as_str().unwrap(), &token_of(&first), 10),
    )
    .await;
    assert_eq!(response.status().as_u16(), 401);

    let response = submit(&app, submission("unknown", "not-a-token", 10)).await;
    assert_eq!(response.status().as_u16(), 401);

    let response = submit(&app, Form::new().text("sessionId", "x")).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing required fields");
}

#[tokio::test]
async fn validate_token_errors() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/api/auth/validate-token"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .client
        .get(app.url("/api/auth/validate-token?token=garbage"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn generate_link_validation_fails() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/auth/generate-link"))
        .json(&json!({
            "candidateEmail": "not-an-email",
            "candidateName": "Jane",
            "role": "quality-analyst"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    assert!(app.state.sessions.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn generate_link_missing_field_is_400() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/auth/generate-link"))
        .json(&json!({
            "candidateEmail": "jane@example.com",
            "candidateName": "Jane"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing required fields");
    assert!(app.state.sessions.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn generate_link_without_secret_is_fatal() {
    let app = spawn_app_with(|config| config.jwt_secret = None).await;

    let response = app
        .client
        .post(app.url("/api/auth/generate-link"))
        .json(&json!({
            "candidateEmail": "jane@example.com",
            "candidateName": "Jane",
            "role": "quality-analyst"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "JWT_SECRET is not configured on the server");
    assert!(app.state.sessions.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_role_is_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/api/interview/questions/astronaut"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn telemetry_is_accepted() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/interview/telemetry"))
        .json(&json!({"sessionId": "S1", "kind": "tab-switch", "count": 2}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 202);
}

#[tokio::test]
async fn admin_routes_require_key_when_configured() {
    let app = spawn_app_with(|config| config.admin_api_key = Some(ADMIN_KEY.to_string())).await;
    let body = json!({
        "candidateEmail": "jane@example.com",
        "candidateName": "Jane",
        "role": "quality-analyst"
    });

    let missing = app
        .client
        .post(app.url("/api/auth/generate-link"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 401);

    let wrong = app
        .client
        .get(app.url("/api/admin/dashboard"))
        .bearer_auth("nope")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status().as_u16(), 403);

    let issued = app
        .client
        .post(app.url("/api/auth/generate-link"))
        .bearer_auth(ADMIN_KEY)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(issued.status().as_u16(), 200);

    // Candidate routes stay open
    let questions = app
        .client
        .get(app.url("/api/interview/questions/quality-analyst"))
        .send()
        .await
        .unwrap();
    assert_eq!(questions.status().as_u16(), 200);
}

#[tokio::test]
async fn dashboard_and_exports() {
    let app = spawn_app().await;
    let link = app.generate_link("Jane Doe", "quality-analyst").await;
    app.generate_link("John Roe", "quality-analyst").await;
    let session_id = link["sessionId"].as_str().unwrap().to_string();
    submit(&app, submission(&session_id, &token_of(&link), 10)).await;

    let dashboard: Value = app
        .client
        .get(app.url("/api/admin/dashboard"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dashboard["statistics"]["totalSessions"], 2);
    assert_eq!(dashboard["statistics"]["completedSessions"], 1);
    assert_eq!(dashboard["statistics"]["pendingSessions"], 1);
    assert_eq!(dashboard["statistics"]["passedCandidates"], 1);
    assert_eq!(dashboard["completedResults"].as_array().unwrap().len(), 1);
    // Tokens never leave the server
    assert!(dashboard["activeSessions"][0].get("token").is_none());

    let export = app
        .client
        .get(app.url("/api/admin/export-results"))
        .send()
        .await
        .unwrap();
    assert_eq!(export.status().as_u16(), 200);
    assert!(
        export.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    let csv = export.text().await.unwrap();
    assert!(csv.contains("Jane Doe,jane@example.com,quality-analyst,100.0,10,10,PASSED"));

    let questions = app
        .client
        .get(app.url("/api/admin/export-questions/Quality Analyst"))
        .send()
        .await
        .unwrap();
    assert_eq!(questions.status().as_u16(), 200);
    assert_eq!(questions.text().await.unwrap().lines().count(), 11);

    let full: Vec<Value> = app
        .client
        .get(app.url("/api/admin/questions/quality-analyst"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(full[0]["correctAnswer"], "answer-1");

    let result = app
        .client
        .get(app.url(&format!("/api/interview/results/{}", session_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(result.status().as_u16(), 200);
}

#[tokio::test]
async fn oversized_recording_is_413() {
    let app = spawn_app().await;
    let link = app.generate_link("Jane Doe", "quality-analyst").await;
    let session_id = link["sessionId"].as_str().unwrap().to_string();
    let token = token_of(&link);

    let form = submission(&session_id, &token, 10).part(
        "recording",
        Part::bytes(vec![0u8; MAX_RECORDING_BYTES + 1])
            .file_name("huge.webm")
            .mime_str("video/webm")
            .unwrap(),
    );
    let response = submit(&app, form).await;

    assert_eq!(response.status().as_u16(), 413);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    let left = std::fs::read_dir(app.state.recordings.directory())
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(left, 0);

    let session = app.state.sessions.get(&session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Pending);
    assert!(app.state.results.load(&session_id).await.unwrap().is_none());
}
