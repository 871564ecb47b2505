use std::path::PathBuf;

use crate::{
    error::AppError,
    models::question::{PublicQuestion, Question, role_slug},
};

/// Per-role question sets stored as `{slug}.json` files.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    directory: PathBuf,
}

impl QuestionBank {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Loads the full, answer-bearing question set for a role.
    pub async fn load(&self, role: &str) -> Result<Vec<Question>, AppError> {
        let slug = role_slug(role);
        let not_found = || AppError::NotFound(format!("Questions not found for role: {}", slug));

        if slug.is_empty() || slug.contains(['/', '\\']) || slug.contains("..") {
            return Err(not_found());
        }

        let path = self.directory.join(format!("{}.json", slug));
        tracing::debug!(role, slug = %slug, path = %path.display(), "Loading question set");

        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Question set not found for role slug: {}", slug);
                return Err(not_found());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&raw).map_err(|e| {
            tracing::error!("Malformed question set {}: {:?}", path.display(), e);
            AppError::InternalServerError(format!("Malformed question set for {}", slug))
        })
    }

    /// Loads a role's questions with the answer keys removed.
    pub async fn load_public(&self, role: &str) -> Result<Vec<PublicQuestion>, AppError> {
        let questions = self.load(role).await?;
        Ok(questions.iter().map(PublicQuestion::from).collect())
    }
}
