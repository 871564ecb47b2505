// src/models/telemetry.rs

use serde::{Deserialize, Serialize};

/// Proctoring signals reported by the candidate runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TelemetryKind {
    InterviewStarted,
    TabSwitch,
    WindowBlur,
    FullscreenExit,
    StreamDisabled,
}

/// Fire-and-forget report posted to `/api/interview/telemetry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub session_id: String,
    pub kind: TelemetryKind,
    /// How many times this kind has fired in the session so far.
    #[serde(default)]
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
