//! Storage for sessions, question sets, results and recordings.

pub mod memory;
pub mod questions;
pub mod recordings;
pub mod results;
pub mod sqlite;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::session::{Session, SessionPatch},
};

pub use memory::InMemorySessionStore;
pub use questions::QuestionBank;
pub use recordings::RecordingStore;
pub use results::ResultStore;
pub use sqlite::SqliteSessionStore;

/// Authoritative session state.
///
/// Implementations must apply a patch as one step: the status check and the
/// write cannot interleave with another mutation of the same session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a new session. Fails if the id is already taken.
    async fn create(&self, session: Session) -> Result<(), AppError>;

    async fn get(&self, session_id: &str) -> Result<Option<Session>, AppError>;

    /// Applies `patch` atomically and returns the updated session.
    ///
    /// Returns `NotFound` for an unknown id and `already_completed` when a
    /// completion patch hits a completed session.
    async fn mutate(&self, session_id: &str, patch: SessionPatch) -> Result<Session, AppError>;

    /// All sessions, newest first.
    async fn list(&self) -> Result<Vec<Session>, AppError>;
}
