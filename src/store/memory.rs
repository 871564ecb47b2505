//! In-memory session storage.
//!
//! Suitable for development, testing, and single-instance deployments.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::SessionStore;
use crate::error::AppError;
use crate::models::session::{Session, SessionPatch, SessionStatus};

/// Stores sessions in a `HashMap` protected by a `RwLock`.
///
/// Sessions are lost when the process restarts. Use
/// [`SqliteSessionStore`](super::SqliteSessionStore) to keep them.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.read().map(|guard| guard.len()).unwrap_or(0)
    }
}

fn poisoned() -> AppError {
    AppError::InternalServerError("Session store lock poisoned".to_owned())
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: Session) -> Result<(), AppError> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;

        if sessions.contains_key(&session.session_id) {
            return Err(AppError::InternalServerError(format!(
                "Session id collision: {}",
                session.session_id
            )));
        }
        sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        Ok(sessions.get(session_id).cloned())
    }

    async fn mutate(&self, session_id: &str, patch: SessionPatch) -> Result<Session, AppError> {
        // Check and write happen under one write guard.
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

        match patch {
            SessionPatch::Complete(completion) => {
                if session.status == SessionStatus::Completed {
                    return Err(AppError::already_completed());
                }
                session.status = SessionStatus::Completed;
                session.completed_at = Some(completion.completed_at);
                session.score = Some(completion.score);
                session.responses = Some(completion.responses);
                session.detailed_results = Some(completion.detailed_results);
                session.recording_file = completion.recording_file;
            }
        }

        Ok(session.clone())
    }

    async fn list(&self) -> Result<Vec<Session>, AppError> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        let mut all: Vec<Session> = sessions.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}
