use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Value, json};

use super::{Email, Mailer, NotifyError};

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Delivers mail through SendGrid's v3 HTTP API.
pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
    endpoint: String,
}

impl SendGridMailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            from: from.into(),
            endpoint: SENDGRID_ENDPOINT.to_string(),
        })
    }

    /// Points the mailer at a different API endpoint (e.g. a local stub).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn payload(&self, email: &Email) -> Result<Value, NotifyError> {
        let mut body = json!({
            "personalizations": [{ "to": [{ "email": email.to }] }],
            "from": { "email": self.from },
            "subject": email.subject,
            "content": [{ "type": "text/html", "value": email.html }],
        });

        if let Some(attachment) = &email.attachment {
            let bytes = tokio::fs::read(&attachment.path).await?;
            body["attachments"] = json!([{
                "content": STANDARD.encode(bytes),
                "filename": attachment.filename,
                "type": attachment.content_type,
                "disposition": "attachment",
            }]);
        }

        Ok(body)
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        let body = self.payload(email).await?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Attachment;

    #[tokio::test]
    async fn payload_includes_base64_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1-r.webm");
        std::fs::write(&path, b"webm").unwrap();

        let mailer = SendGridMailer::new("key", "hr@example.com").unwrap();
        let email = Email {
            to: "recruiter@example.com".to_string(),
            subject: "Result".to_string(),
            html: "<p>x</p>".to_string(),
            attachment: Some(Attachment {
                filename: "1-r.webm".to_string(),
                content_type: "video/webm".to_string(),
                path,
            }),
        };

        let body = mailer.payload(&email).await.unwrap();
        assert_eq!(body["from"]["email"], "hr@example.com");
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "recruiter@example.com");
        assert_eq!(body["attachments"][0]["content"], STANDARD.encode(b"webm"));
        assert_eq!(body["attachments"][0]["type"], "video/webm");
    }
}
