//! Contract for the AI sentiment backend.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ScoreOutOfRange, SentimentScore};

/// Failures surfaced by a [`SentimentService`] backend.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SentimentError {
    #[error("sentiment request failed: {0}")]
    Upstream(String),

    #[error("sentiment service returned no content")]
    EmptyResponse,

    #[error("sentiment service returned a non-numeric score: {0:?}")]
    MalformedScore(String),

    #[error(transparent)]
    InvalidScore(#[from] ScoreOutOfRange),
}

/// AI operations the check-in pipeline and daily summary depend on.
#[async_trait]
pub trait SentimentService: Send + Sync {
    /// Scores the emotion expressed by `input` on the 0..=100 scale.
    ///
    /// `input` is the full text the user submitted, emoji token included.
    async fn emotion_score(&self, input: &str) -> Result<SentimentScore, SentimentError>;

    /// Suggests one short mood-improving task for a scored check-in.
    async fn task_suggestion(
        &self,
        emoji: &str,
        description: &str,
        score: SentimentScore,
    ) -> Result<String, SentimentError>;

    /// Summarizes the overall mood behind an average score.
    async fn daily_summary(&self, average_score: f64) -> Result<String, SentimentError>;
}
