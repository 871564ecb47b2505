// tests/common/mod.rs

#![allow(dead_code)]

use std::path::Path;

use interview_backend::{config::Config, routes, state::AppState};
use serde_json::{Value, json};
use tempfile::TempDir;

pub const SECRET: &str = "test_secret_for_integration_tests";
pub const ADMIN_KEY: &str = "test-admin-key";

/// A running server plus the directories backing it.
pub struct TestApp {
    pub address: String,
    pub state: AppState,
    pub client: reqwest::Client,
    // Dropped with the app.
    _root: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Issues a link through the API and returns the response body.
    pub async fn generate_link(&self, name: &str, role: &str) -> Value {
        let response = self
            .client
            .post(self.url("/api/auth/generate-link"))
            .json(&json!({
                "candidateEmail": "jane@example.com",
                "candidateName": name,
                "role": role,
                "duration": 60
            }))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status().as_u16(), 200);
        response.json().await.unwrap()
    }
}

pub fn test_config(root: &Path) -> Config {
    Config {
        app_url: Some("http://127.0.0.1:3000".to_string()),
        jwt_secret: Some(SECRET.to_string()),
        recruiter_email: Some("recruiter@example.com".to_string()),
        sendgrid_api_key: None,
        sendgrid_from: None,
        admin_api_key: None,
        database_url: None,
        questions_path: root.join("questions"),
        recordings_path: root.join("recordings"),
        results_path: root.join("results"),
        port: 0,
        rust_log: "error".to_string(),
    }
}

/// Ten questions; the correct answer to question `i` is `answer(i)`.
pub fn write_question_set(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();

    let questions: Vec<Value> = (0..10)
        .map(|i| {
            if i % 2 == 0 {
                json!({
                    "id": i + 1,
                    "question": format!("Multiple choice question {}", i + 1),
                    "type": "multiple-choice",
                    "options": [answer(i), "Something else"],
                    "correctAnswer": answer(i),
                    "timeLimit": 60,
                    "difficulty": "Easy"
                })
            } else {
                json!({
                    "id": i + 1,
                    "question": format!("Text question {}", i + 1),
                    "type": "text",
                    "correctAnswer": answer(i)
                })
            }
        })
        .collect();

    std::fs::write(
        dir.join("quality-analyst.json"),
        serde_json::to_vec_pretty(&questions).unwrap(),
    )
    .unwrap();
}

pub fn answer(index: usize) -> String {
    format!("answer-{}", index + 1)
}

/// `responses` JSON with the first `correct` answers right and the rest wrong.
pub fn responses_json(correct: usize) -> String {
    let responses: Vec<Value> = (0..10)
        .map(|i| {
            let given = if i < correct { answer(i) } else { "wrong".to_string() };
            json!({
                "questionId": i + 1,
                "answer": given,
                "timeTaken": 5
            })
        })
        .collect();
    serde_json::to_string(&responses).unwrap()
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Spawns the app on a random port after letting the caller adjust the config.
pub async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = test_config(root.path());
    configure(&mut config);
    write_question_set(&config.questions_path);

    let state = AppState::in_memory(config);
    let app = routes::create_router(state.clone());

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        state,
        client: reqwest::Client::new(),
        _root: root,
    }
}
