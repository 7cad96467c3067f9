//! Persistence contract for emotion check-ins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{CreateEmotionRequest, EmotionId, UpdateEmotionRequest};

/// Failures surfaced by an [`EmotionStore`] backend.
///
/// `NotFound` is kept separate from backend faults so callers can tell a
/// missing row apart from an unavailable database.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("emotion {id} not found")]
    NotFound { id: EmotionId },

    #[error("database error: {0}")]
    Database(String),

    #[error("failed to decode stored row: {0}")]
    Decode(String),
}

/// Storage operations the check-in pipeline depends on.
#[async_trait]
pub trait EmotionStore: Send + Sync {
    /// Persists a new check-in and returns its storage-assigned id.
    async fn create_emotion(&self, request: CreateEmotionRequest) -> Result<EmotionId, StoreError>;

    /// Applies a partial update to an existing record.
    ///
    /// Returns [`StoreError::NotFound`] when `id` does not exist.
    async fn update_emotion(
        &self,
        id: EmotionId,
        patch: UpdateEmotionRequest,
    ) -> Result<(), StoreError>;

    /// Mean sentiment score across scored check-ins created at or after
    /// `since`, or `None` when no scored rows fall in the window.
    async fn average_score_since(&self, since: DateTime<Utc>) -> Result<Option<f64>, StoreError>;
}
