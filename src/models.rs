use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::StudyError;

/// Subject assigned when none is given.
pub const DEFAULT_SUBJECT: &str = "Unfiled";
/// Theme assigned when none is given.
pub const DEFAULT_THEME: &str = "Untitled";

pub const INITIAL_EASE_FACTOR: f64 = 2.5;
pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const INITIAL_INTERVAL_DAYS: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub subject: String,
    pub theme: String,
    pub question: String,
    pub answer: String,
    pub ease_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    pub created_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub next_review_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_grade: Option<Grade>,
}

impl Card {
    /// Build a fresh, immediately due card. Inputs must already be normalized.
    pub(crate) fn new(request: NewCard, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: request.subject,
            theme: request.theme,
            question: request.question,
            answer: request.answer,
            ease_factor: INITIAL_EASE_FACTOR,
            interval_days: INITIAL_INTERVAL_DAYS,
            repetitions: 0,
            created_at: now,
            last_reviewed_at: None,
            next_review_at: Some(now),
            last_grade: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.next_review_at {
            Some(next) => next <= now,
            None => true,
        }
    }

    pub fn confidence(&self) -> Confidence {
        match self.last_grade {
            Some(grade) => grade.into(),
            // Records written before grades were tracked
            None if self.repetitions == 0 && self.last_reviewed_at.is_some() => Confidence::Low,
            None => Confidence::Unrated,
        }
    }

    pub fn belongs_to(&self, subject: &str, theme: &str) -> bool {
        self.subject == subject && self.theme == theme
    }

    /// Key used to detect the same question/answer pair entered twice.
    pub(crate) fn content_key(&self) -> ContentKey {
        content_key(&self.question, &self.answer)
    }
}

/// Normalized `(question, answer)`: lowercased, whitespace collapsed.
pub(crate) type ContentKey = (String, String);

pub(crate) fn content_key(question: &str, answer: &str) -> ContentKey {
    (normalize_text(question), normalize_text(answer))
}

fn normalize_text(value: &str) -> String {
    value
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Learner's self-reported recall for one review.
///
/// Quality anchors are fixed at Hard = 1, Normal = 3, Easy = 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Hard,
    Normal,
    Easy,
}

impl Grade {
    /// Quality below this value counts as a failed recall.
    pub const SUCCESS_THRESHOLD: i32 = 3;

    pub fn quality(self) -> i32 {
        match self {
            Self::Hard => 1,
            Self::Normal => 3,
            Self::Easy => 5,
        }
    }

    pub fn from_quality(quality: i32) -> Result<Self, StudyError> {
        match quality {
            1 => Ok(Self::Hard),
            3 => Ok(Self::Normal),
            5 => Ok(Self::Easy),
            other => Err(StudyError::Validation(format!(
                "grade quality must be 1 (hard), 3 (normal) or 5 (easy), got {}",
                other
            ))),
        }
    }

    pub fn is_success(self) -> bool {
        self.quality() >= Self::SUCCESS_THRESHOLD
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hard => "hard",
            Self::Normal => "normal",
            Self::Easy => "easy",
        };
        f.write_str(name)
    }
}

/// Confidence level derived from the last recorded grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Unrated,
    Low,
    Medium,
    High,
}

impl From<Grade> for Confidence {
    fn from(grade: Grade) -> Self {
        match grade {
            Grade::Hard => Self::Low,
            Grade::Normal => Self::Medium,
            Grade::Easy => Self::High,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCardRequest {
    pub question: String,
    pub answer: String,
    pub subject: Option<String>,
    pub theme: Option<String>,
}

impl CreateCardRequest {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            subject: None,
            theme: None,
        }
    }

    pub fn in_theme(mut self, subject: impl Into<String>, theme: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self.theme = Some(theme.into());
        self
    }
}

/// Only the provided fields are overwritten.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCardRequest {
    pub subject: Option<String>,
    pub theme: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
}

/// One `(question, answer)` pair handed over by a card generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPair {
    pub question: String,
    pub answer: String,
}

impl GeneratedPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub created: Vec<Card>,
    pub duplicates_skipped: usize,
}

/// Validated, trimmed card content ready to be stored.
#[derive(Debug, Clone)]
pub(crate) struct NewCard {
    pub subject: String,
    pub theme: String,
    pub question: String,
    pub answer: String,
}

impl NewCard {
    pub fn validate(
        question: &str,
        answer: &str,
        subject: Option<&str>,
        theme: Option<&str>,
    ) -> Result<Self, StudyError> {
        Ok(Self {
            question: required_text("question", question)?,
            answer: required_text("answer", answer)?,
            subject: label_or_default(subject, DEFAULT_SUBJECT),
            theme: label_or_default(theme, DEFAULT_THEME),
        })
    }
}

pub(crate) fn required_text(field: &str, value: &str) -> Result<String, StudyError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StudyError::Validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn label_or_default(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => default.to_string(),
    }
}
