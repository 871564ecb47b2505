// src/models/question.rs

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_TIME_LIMIT_SECONDS;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Question identifier as written in the question files (numeric or textual).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionId {
    Number(i64),
    Text(String),
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionId::Number(n) => write!(f, "{}", n),
            QuestionId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    Text,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::Text => "text",
        }
    }
}

/// Server-held question, including the answer key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,

    pub question: String,

    #[serde(rename = "type")]
    pub question_type: QuestionType,

    /// Present only for multiple-choice questions.
    #[serde(default)]
    pub options: Option<Vec<String>>,

    pub correct_answer: String,

    #[serde(default = "default_time_limit")]
    pub time_limit: u32,

    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

fn default_time_limit() -> u32 {
    DEFAULT_TIME_LIMIT_SECONDS
}

fn default_difficulty() -> String {
    "Medium".to_string()
}

/// DTO for sending a question to the candidate (no answer key, no difficulty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: QuestionId,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Option<Vec<String>>,
    pub time_limit: u32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id.clone(),
            question: q.question.clone(),
            question_type: q.question_type,
            options: q.options.clone(),
            time_limit: q.time_limit,
        }
    }
}

/// Maps a role name to its question-set slug: lower-cased, whitespace runs to '-'.
pub fn role_slug(role: &str) -> String {
    WHITESPACE
        .replace_all(role.trim(), "-")
        .to_lowercase()
}
