//! Outbound email: invitation links for candidates and results for recruiters.
//!
//! Handlers never send mail themselves. They push an [`Email`] onto the
//! [`NotificationQueue`], whose worker delivers it with retries in the
//! background, so a slow or failing provider cannot block or fail a request.

pub mod queue;
pub mod sendgrid;
pub mod templates;

use std::path::PathBuf;

use async_trait::async_trait;

pub use queue::{NotificationQueue, RetryPolicy};
pub use sendgrid::SendGridMailer;

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachment: Option<Attachment>,
}

/// File attached to an email, read from disk at delivery time.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("mail provider rejected the message: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("mail request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not read attachment: {0}")]
    Attachment(#[from] std::io::Error),
}

/// A mail provider.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), NotifyError>;
}
