//! Domain types for emotion check-ins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Storage-assigned identifier for a persisted emotion record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionId(pub i64);

impl fmt::Display for EmotionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raised when a sentiment score falls outside the inclusive `0..=100` range.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("sentiment score {0} is outside the 0..=100 range")]
pub struct ScoreOutOfRange(pub i64);

/// Sentiment score on a closed scale: 0 is very negative, 100 is very positive.
///
/// Construction is validated; a stored or transported score can never leave
/// the scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct SentimentScore(u8);

impl SentimentScore {
    pub fn new(value: i64) -> Result<Self, ScoreOutOfRange> {
        if (0..=100).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ScoreOutOfRange(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for SentimentScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for SentimentScore {
    type Error = ScoreOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SentimentScore> for i64 {
    fn from(score: SentimentScore) -> Self {
        i64::from(score.0)
    }
}

/// A persisted emotion check-in.
///
/// `score` and `task` start empty and are filled in by later pipeline stages,
/// so a record caught between stages is still a valid row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emotion {
    pub id: EmotionId,
    pub user_id: String,
    pub emoji: String,
    pub description: String,
    pub score: Option<SentimentScore>,
    pub messaged_at: Option<DateTime<Utc>>,
    pub task: Option<String>,
    pub task_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to persist a new check-in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEmotionRequest {
    pub user_id: String,
    pub emoji: String,
    pub description: String,
}

/// Partial update for an existing record. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEmotionRequest {
    pub emoji: Option<String>,
    pub description: Option<String>,
    pub score: Option<SentimentScore>,
    pub messaged_at: Option<DateTime<Utc>>,
    pub task: Option<String>,
    pub task_completed_at: Option<DateTime<Utc>>,
}

impl UpdateEmotionRequest {
    /// Patch that records a sentiment score and nothing else.
    pub fn with_score(score: SentimentScore) -> Self {
        Self {
            score: Some(score),
            ..Self::default()
        }
    }

    /// Patch that records a suggested task and nothing else.
    pub fn with_task(task: impl Into<String>) -> Self {
        Self {
            task: Some(task.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.emoji.is_none()
            && self.description.is_none()
            && self.score.is_none()
            && self.messaged_at.is_none()
            && self.task.is_none()
            && self.task_completed_at.is_none()
    }
}
