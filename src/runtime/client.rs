use std::time::Duration;

use reqwest::{
    StatusCode,
    multipart::{Form, Part},
};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use super::machine::SubmissionPayload;
use crate::models::{
    question::{PublicQuestion, role_slug},
    session::ValidateTokenResponse,
    telemetry::TelemetryEvent,
};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error body.
    #[error("{message} (HTTP {status})")]
    Api { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Failed to encode responses: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub session_id: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the candidate-facing endpoints.
#[derive(Debug, Clone)]
pub struct InterviewApi {
    client: reqwest::Client,
    base_url: Url,
}

impl InterviewApi {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn validate_token(&self, token: &str) -> Result<ValidateTokenResponse, ClientError> {
        let mut url = self.endpoint(&["api", "auth", "validate-token"])?;
        url.query_pairs_mut().append_pair("token", token);

        let response = self.client.get(url).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// Question set for `role`, addressed by its slug.
    pub async fn fetch_questions(&self, role: &str) -> Result<Vec<PublicQuestion>, ClientError> {
        let slug = role_slug(role);
        let url = self.endpoint(&["api", "interview", "questions", &slug])?;

        let response = self.client.get(url).send().await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitResponse, ClientError> {
        let url = self.endpoint(&["api", "interview", "submit"])?;

        let mut form = Form::new()
            .text("sessionId", payload.session_id.clone())
            .text("token", payload.token.clone())
            .text("responses", serde_json::to_string(&payload.responses)?)
            .text("transcript", payload.transcript.clone());

        if let Some(recording) = &payload.recording {
            let part = Part::bytes(recording.bytes.clone())
                .file_name(recording.file_name.clone())
                .mime_str("video/webm")?;
            form = form.part("recording", part);
        }

        let response = self.client.post(url).multipart(form).send().await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn report_telemetry(&self, event: &TelemetryEvent) -> Result<(), ClientError> {
        let url = self.endpoint(&["api", "interview", "telemetry"])?;

        let response = self.client.post(url).json(event).send().await?;
        check(response).await?;
        Ok(())
    }
}

/// Turns a non-success response into [`ClientError::Api`] carrying the server's message.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    Err(ClientError::Api { status, message })
}
