//! SQLite-backed session storage.
//!
//! Keeps sessions across restarts. Completion is a conditional
//! `UPDATE ... WHERE status = 'pending'`, so concurrent submissions for the
//! same session cannot both succeed.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    types::Json,
};

use super::SessionStore;
use crate::error::AppError;
use crate::models::{
    result::{CandidateResponse, QuestionOutcome},
    session::{Session, SessionPatch, SessionStatus},
};

#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct SessionRow {
    session_id: String,
    candidate_name: String,
    candidate_email: String,
    role: String,
    token: String,
    expires_at: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    score: Option<f64>,
    responses: Option<Json<Vec<Option<CandidateResponse>>>>,
    detailed_results: Option<Json<Vec<QuestionOutcome>>>,
    recording_file: Option<String>,
}

impl TryFrom<SessionRow> for Session {
    type Error = AppError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let status = SessionStatus::parse(&row.status).ok_or_else(|| {
            AppError::InternalServerError(format!("Unknown session status: {}", row.status))
        })?;

        Ok(Session {
            session_id: row.session_id,
            candidate_name: row.candidate_name,
            candidate_email: row.candidate_email,
            role: row.role,
            token: row.token,
            expires_at: row.expires_at,
            status,
            created_at: row.created_at,
            completed_at: row.completed_at,
            score: row.score,
            responses: row.responses.map(|r| r.0),
            detailed_results: row.detailed_results.map(|d| d.0),
            recording_file: row.recording_file,
        })
    }
}

const SELECT_SESSION: &str = r#"
    SELECT
        session_id, candidate_name, candidate_email, role, token,
        expires_at, status, created_at, completed_at, score,
        responses, detailed_results, recording_file
    FROM sessions
"#;

impl SqliteSessionStore {
    /// Connects (creating the database file if needed) and runs migrations.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // An in-memory database exists per connection, so keep exactly one.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::InternalServerError(format!("Migration failed: {}", e)))
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self, session: Session) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sessions
                (session_id, candidate_name, candidate_email, role, token, expires_at, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.session_id)
        .bind(&session.candidate_name)
        .bind(&session.candidate_email)
        .bind(&session.role)
        .bind(&session.token)
        .bind(session.expires_at)
        .bind(session.status.as_str())
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert session {}: {:?}", session.session_id, e);
            AppError::from(e)
        })?;

        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!("{} WHERE session_id = ?", SELECT_SESSION))
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Session::try_from).transpose()
    }

    async fn mutate(&self, session_id: &str, patch: SessionPatch) -> Result<Session, AppError> {
        match patch {
            SessionPatch::Complete(completion) => {
                let result = sqlx::query(
                    r#"
                    UPDATE sessions SET
                        status = 'completed',
                        completed_at = ?,
                        score = ?,
                        responses = ?,
                        detailed_results = ?,
                        recording_file = ?
                    WHERE session_id = ? AND status = 'pending'
                    "#,
                )
                .bind(completion.completed_at)
                .bind(completion.score)
                .bind(Json(&completion.responses))
                .bind(Json(&completion.detailed_results))
                .bind(&completion.recording_file)
                .bind(session_id)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    return match self.get(session_id).await? {
                        Some(_) => Err(AppError::already_completed()),
                        None => Err(AppError::NotFound("Session not found".to_string())),
                    };
                }
            }
        }

        self.get(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }

    async fn list(&self) -> Result<Vec<Session>, AppError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!("{} ORDER BY created_at DESC", SELECT_SESSION))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Session::try_from).collect()
    }
}
