use std::path::{Path, PathBuf};

use crate::{error::AppError, models::result::InterviewResult};

/// One JSON file per completed session, named `{session_id}.json`.
#[derive(Debug, Clone)]
pub struct ResultStore {
    directory: PathBuf,
}

impl ResultStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, session_id: &str) -> Result<PathBuf, AppError> {
        if session_id.is_empty() || session_id.contains(['/', '\\', '.']) {
            return Err(AppError::BadRequest("Invalid session id".to_string()));
        }
        Ok(self.directory.join(format!("{}.json", session_id)))
    }

    /// Writes the result, replacing any earlier file for the same session.
    pub async fn save(&self, result: &InterviewResult) -> Result<PathBuf, AppError> {
        let path = self.path_for(&result.session_id)?;
        tokio::fs::create_dir_all(&self.directory).await?;

        let body = serde_json::to_vec_pretty(result)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        // Write then rename so readers never see a half-written file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        Ok(path)
    }

    pub async fn load(&self, session_id: &str) -> Result<Option<InterviewResult>, AppError> {
        let path = self.path_for(session_id)?;
        match tokio::fs::read(&path).await {
            Ok(raw) => Ok(Some(decode(&path, &raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All stored results, oldest completion first.
    pub async fn list(&self) -> Result<Vec<InterviewResult>, AppError> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut results = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = tokio::fs::read(&path).await?;
            match decode(&path, &raw) {
                Ok(result) => results.push(result),
                Err(_) => continue,
            }
        }

        results.sort_by(|a, b| a.completed_at.cmp(&b.completed_at));
        Ok(results)
    }
}

fn decode(path: &Path, raw: &[u8]) -> Result<InterviewResult, AppError> {
    serde_json::from_slice(raw).map_err(|e| {
        tracing::error!("Unreadable result file {}: {:?}", path.display(), e);
        AppError::InternalServerError(format!("Unreadable result file {}", path.display()))
    })
}
