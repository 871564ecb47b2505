// src/config.rs

use std::{env, path::PathBuf};

use dotenvy::dotenv;

use crate::error::AppError;

/// Minimum score (percent) a candidate needs to pass.
pub const PASSING_SCORE_PERCENTAGE: f64 = 70.0;

/// Per-question time limit when the question file omits one.
pub const DEFAULT_TIME_LIMIT_SECONDS: u32 = 120;

/// Link validity when the admin does not pass a duration.
pub const DEFAULT_LINK_DURATION_MINUTES: i64 = 60;

/// Upper bound for an uploaded interview recording.
pub const MAX_RECORDING_BYTES: usize = 100 * 1024 * 1024;

/// How long a signed recording download link stays valid.
pub const DOWNLOAD_LINK_TTL_HOURS: i64 = 24;

/// Recordings above this size are linked, not attached.
pub const MAX_ATTACHMENT_BYTES: u64 = 15 * 1024 * 1024;

pub const NOTIFICATION_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct Config {
    /// Public base URL used to build interview and download links.
    pub app_url: Option<String>,
    /// Secret for interview tokens and recording download signatures.
    pub jwt_secret: Option<String>,
    pub recruiter_email: Option<String>,
    pub sendgrid_api_key: Option<String>,
    pub sendgrid_from: Option<String>,
    /// Bearer key for admin routes. Admin routes are open when unset.
    pub admin_api_key: Option<String>,
    /// SQLite URL for a durable session store. In-memory when unset.
    pub database_url: Option<String>,
    pub questions_path: PathBuf,
    pub recordings_path: PathBuf,
    pub results_path: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            app_url: non_empty_var("APP_URL"),
            jwt_secret: non_empty_var("JWT_SECRET"),
            recruiter_email: non_empty_var("RECRUITER_EMAIL"),
            sendgrid_api_key: non_empty_var("SENDGRID_API_KEY"),
            sendgrid_from: non_empty_var("SENDGRID_FROM").or_else(|| non_empty_var("EMAIL_USER")),
            admin_api_key: non_empty_var("ADMIN_API_KEY"),
            database_url: non_empty_var("DATABASE_URL"),
            questions_path: path_var("QUESTIONS_PATH", "data/questions"),
            recordings_path: path_var("RECORDINGS_PATH", "recordings"),
            results_path: path_var("RESULTS_PATH", "results"),
            port,
            rust_log,
        }
    }

    /// Base URL with trailing slashes removed.
    pub fn require_app_url(&self) -> Result<&str, AppError> {
        self.app_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::ConfigurationMissing("APP_URL".to_string()))
    }

    pub fn require_secret(&self) -> Result<&str, AppError> {
        self.jwt_secret
            .as_deref()
            .ok_or_else(|| AppError::ConfigurationMissing("JWT_SECRET".to_string()))
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn path_var(key: &str, default: &str) -> PathBuf {
    non_empty_var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}
