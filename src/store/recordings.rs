use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs::{File, OpenOptions};

use crate::error::AppError;

const DEFAULT_RECORDING_NAME: &str = "recording.webm";

/// Directory of uploaded interview recordings.
#[derive(Debug, Clone)]
pub struct RecordingStore {
    directory: PathBuf,
}

impl RecordingStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Opens a fresh file for an upload, named `{epoch_millis}-{original}`.
    ///
    /// Returns the stored filename and the open handle.
    pub async fn create(&self, original_name: Option<&str>) -> Result<(String, File), AppError> {
        tokio::fs::create_dir_all(&self.directory).await?;

        let base = sanitize_file_name(original_name.unwrap_or(DEFAULT_RECORDING_NAME));
        let mut millis = Utc::now().timestamp_millis();

        // Bump the prefix on the rare same-millisecond collision.
        for _ in 0..16 {
            let filename = format!("{}-{}", millis, base);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.directory.join(&filename))
                .await
            {
                Ok(file) => return Ok((filename, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => millis += 1,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::InternalServerError(
            "Could not allocate a recording filename".to_string(),
        ))
    }

    /// Path of a stored recording. Rejects names that could leave the directory.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, AppError> {
        if filename.is_empty()
            || filename.contains(['/', '\\'])
            || filename.starts_with('.')
        {
            return Err(AppError::BadRequest("Invalid recording filename".to_string()));
        }
        Ok(self.directory.join(filename))
    }

    /// File size, or `None` if the recording does not exist.
    pub async fn size(&self, filename: &str) -> Result<Option<u64>, AppError> {
        let path = self.resolve(filename)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn remove(&self, filename: &str) {
        let Ok(path) = self.resolve(filename) else {
            return;
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("Failed to remove recording {}: {}", path.display(), e);
        }
    }
}

/// Keeps ASCII alphanumerics, '.', '-' and '_'; everything else becomes '_'.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        DEFAULT_RECORDING_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn sanitizes_upload_names() {
        assert_eq!(sanitize_file_name("interview-S1.webm"), "interview-S1.webm");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("my clip (1).webm"), "my_clip__1_.webm");
        assert_eq!(sanitize_file_name("..."), "recording.webm");
    }

    #[tokio::test]
    async fn create_is_timestamp_prefixed_and_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());

        let (first, mut file) = store.create(Some("r.webm")).await.unwrap();
        file.write_all(b"abc").await.unwrap();
        file.flush().await.unwrap();
        let (second, _) = store.create(Some("r.webm")).await.unwrap();

        assert_ne!(first, second);
        assert!(first.ends_with("-r.webm"));
        assert!(first.split('-').next().unwrap().parse::<i64>().is_ok());
        assert_eq!(store.size(&first).await.unwrap(), Some(3));
        assert_eq!(store.size("missing.webm").await.unwrap(), None);
    }

    #[test]
    fn resolve_rejects_traversal() {
        let store = RecordingStore::new("/tmp/recordings");
        assert!(store.resolve("../secret").is_err());
        assert!(store.resolve(".hidden").is_err());
        assert!(store.resolve("123-r.webm").is_ok());
    }
}
