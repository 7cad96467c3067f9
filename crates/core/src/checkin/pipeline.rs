//! The emotion-processing pipeline behind the `/vibe` slash command.
//!
//! One invocation runs a strict stage sequence: parse the input, persist an
//! initial record, score the sentiment, persist the score, generate a task
//! suggestion, persist the task, reply with the task text. Primary-path
//! failures abort the remainder; the two follow-up writes are best-effort
//! and only logged. Every stage races a cancellation token so shutdown can
//! interrupt in-flight check-ins.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::checkin::parser::{parse_checkin, ParseError};
use crate::domain::{CreateEmotionRequest, UpdateEmotionRequest};
use crate::sentiment::{SentimentError, SentimentService};
use crate::store::{EmotionStore, StoreError};

/// Reply when the command carried no input at all.
pub const PROMPT_REPLY: &str = "Please provide an emoji and optional text.";

/// Reply when the first token fails the emoji grammar.
pub const USAGE_REPLY: &str =
    "That emoji does not look right. Start with a token like `:smile:`, then optional text.";

/// Reply when the initial record could not be persisted.
pub const CREATE_FAILED_REPLY: &str = "Error processing your request. Please try again.";

/// Reply when sentiment scoring failed.
pub const SCORE_FAILED_REPLY: &str =
    "Could not score your check-in right now. Please try again later.";

/// Reply when task generation failed.
pub const SUGGESTION_FAILED_REPLY: &str =
    "Could not come up with a task suggestion right now. Please try again later.";

/// Terminal outcomes of a check-in that did not produce a task reply.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CheckinError {
    /// User-correctable input problem.
    #[error("unusable check-in input: {0}")]
    Usage(ParseError),

    /// The slash-command payload arrived without a user id. A transport
    /// contract violation, never the user's fault, so no reply is sent.
    #[error("slash command payload is missing a user id")]
    MissingUserId,

    /// The initial record could not be persisted; nothing later ran.
    #[error("could not persist check-in: {0}")]
    CreateFailed(StoreError),

    /// Sentiment scoring failed; the stored record stays un-scored.
    #[error("could not score check-in: {0}")]
    ScoreFailed(SentimentError),

    /// Task generation failed; the stored record keeps its score.
    #[error("could not generate task suggestion: {0}")]
    SuggestionFailed(SentimentError),

    /// The surrounding process is shutting down.
    #[error("check-in cancelled before completion")]
    Cancelled,
}

impl CheckinError {
    /// Reply text for errors the user should hear about, `None` for
    /// conditions that must stay silent.
    pub fn user_reply(&self) -> Option<&'static str> {
        match self {
            Self::Usage(_) => Some(USAGE_REPLY),
            Self::CreateFailed(_) => Some(CREATE_FAILED_REPLY),
            Self::ScoreFailed(_) => Some(SCORE_FAILED_REPLY),
            Self::SuggestionFailed(_) => Some(SUGGESTION_FAILED_REPLY),
            Self::MissingUserId | Self::Cancelled => None,
        }
    }
}

/// Seam between event dispatch and the pipeline, so transports can be
/// tested against scripted check-in services.
#[async_trait]
pub trait CheckinService: Send + Sync {
    async fn handle_checkin(
        &self,
        user_id: &str,
        raw_input: &str,
        cancel: &CancellationToken,
    ) -> Result<String, CheckinError>;
}

/// Stateless orchestrator over the store and sentiment contracts.
pub struct CheckinPipeline {
    store: Arc<dyn EmotionStore>,
    sentiment: Arc<dyn SentimentService>,
}

impl CheckinPipeline {
    pub fn new(store: Arc<dyn EmotionStore>, sentiment: Arc<dyn SentimentService>) -> Self {
        Self { store, sentiment }
    }

    /// Runs one check-in to completion.
    ///
    /// `Ok` carries the exact reply text. `Err` values that warrant a reply
    /// map to one through [`CheckinError::user_reply`]; `MissingUserId` and
    /// `Cancelled` stay silent.
    pub async fn handle(
        &self,
        user_id: &str,
        raw_input: &str,
        cancel: &CancellationToken,
    ) -> Result<String, CheckinError> {
        if cancel.is_cancelled() {
            return Err(CheckinError::Cancelled);
        }

        let input = match parse_checkin(raw_input) {
            Ok(input) => input,
            Err(ParseError::Empty) => return Ok(PROMPT_REPLY.to_string()),
            Err(error) => return Err(CheckinError::Usage(error)),
        };

        if user_id.is_empty() {
            error!(
                event_name = "checkin.pipeline.missing_user_id",
                emoji = %input.emoji,
                "slash command arrived without a user id"
            );
            return Err(CheckinError::MissingUserId);
        }

        info!(
            event_name = "checkin.pipeline.received",
            user_id = %user_id,
            emoji = %input.emoji,
            "processing check-in"
        );

        let request = CreateEmotionRequest {
            user_id: user_id.to_string(),
            emoji: input.emoji.clone(),
            description: input.description.clone(),
        };
        let id = race(cancel, self.store.create_emotion(request))
            .await?
            .map_err(|cause| {
                error!(
                    event_name = "checkin.pipeline.create_failed",
                    user_id = %user_id,
                    error = %cause,
                    "failed to persist check-in"
                );
                CheckinError::CreateFailed(cause)
            })?;

        // The full raw input is scored, emoji token included.
        let score = race(cancel, self.sentiment.emotion_score(raw_input))
            .await?
            .map_err(|cause| {
                error!(
                    event_name = "checkin.pipeline.score_failed",
                    emotion_id = %id,
                    error = %cause,
                    "sentiment scoring failed"
                );
                CheckinError::ScoreFailed(cause)
            })?;
        debug!(
            event_name = "checkin.pipeline.scored",
            emotion_id = %id,
            score = %score,
            "sentiment score received"
        );

        let score_patch = UpdateEmotionRequest::with_score(score);
        if let Err(cause) = race(cancel, self.store.update_emotion(id, score_patch)).await? {
            warn!(
                event_name = "checkin.pipeline.score_update_failed",
                emotion_id = %id,
                error = %cause,
                "score not persisted; continuing"
            );
        }

        let task = race(
            cancel,
            self.sentiment
                .task_suggestion(&input.emoji, &input.description, score),
        )
        .await?
        .map_err(|cause| {
            error!(
                event_name = "checkin.pipeline.suggestion_failed",
                emotion_id = %id,
                error = %cause,
                "task suggestion failed"
            );
            CheckinError::SuggestionFailed(cause)
        })?;

        let task_patch = UpdateEmotionRequest::with_task(task.clone());
        if let Err(cause) = race(cancel, self.store.update_emotion(id, task_patch)).await? {
            warn!(
                event_name = "checkin.pipeline.task_update_failed",
                emotion_id = %id,
                error = %cause,
                "task not persisted; continuing"
            );
        }

        info!(
            event_name = "checkin.pipeline.completed",
            emotion_id = %id,
            score = %score,
            "check-in processed"
        );
        Ok(task)
    }
}

#[async_trait]
impl CheckinService for CheckinPipeline {
    async fn handle_checkin(
        &self,
        user_id: &str,
        raw_input: &str,
        cancel: &CancellationToken,
    ) -> Result<String, CheckinError> {
        self.handle(user_id, raw_input, cancel).await
    }
}

/// Races a stage against cancellation. A cancelled token wins immediately
/// and the stage future is never polled.
async fn race<T>(
    cancel: &CancellationToken,
    operation: impl Future<Output = T>,
) -> Result<T, CheckinError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CheckinError::Cancelled),
        value = operation => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EmotionId, SentimentScore};
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        creates: Mutex<Vec<CreateEmotionRequest>>,
        updates: Mutex<Vec<(EmotionId, UpdateEmotionRequest)>>,
        create_results: Mutex<VecDeque<Result<EmotionId, StoreError>>>,
        update_results: Mutex<VecDeque<Result<(), StoreError>>>,
    }

    #[async_trait]
    impl EmotionStore for RecordingStore {
        async fn create_emotion(
            &self,
            request: CreateEmotionRequest,
        ) -> Result<EmotionId, StoreError> {
            self.creates.lock().await.push(request);
            self.create_results
                .lock()
                .await
                .pop_front()
                .unwrap_or(Ok(EmotionId(1)))
        }

        async fn update_emotion(
            &self,
            id: EmotionId,
            patch: UpdateEmotionRequest,
        ) -> Result<(), StoreError> {
            self.updates.lock().await.push((id, patch));
            self.update_results.lock().await.pop_front().unwrap_or(Ok(()))
        }

        async fn average_score_since(
            &self,
            _since: chrono::DateTime<chrono::Utc>,
        ) -> Result<Option<f64>, StoreError> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct RecordingSentiment {
        score_inputs: Mutex<Vec<String>>,
        suggestion_inputs: Mutex<Vec<(String, String, SentimentScore)>>,
        score_results: Mutex<VecDeque<Result<SentimentScore, SentimentError>>>,
        suggestion_results: Mutex<VecDeque<Result<String, SentimentError>>>,
    }

    #[async_trait]
    impl SentimentService for RecordingSentiment {
        async fn emotion_score(&self, input: &str) -> Result<SentimentScore, SentimentError> {
            self.score_inputs.lock().await.push(input.to_string());
            self.score_results
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Ok(SentimentScore::new(85).unwrap()))
        }

        async fn task_suggestion(
            &self,
            emoji: &str,
            description: &str,
            score: SentimentScore,
        ) -> Result<String, SentimentError> {
            self.suggestion_inputs
                .lock()
                .await
                .push((emoji.to_string(), description.to_string(), score));
            self.suggestion_results
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Ok("take a walk".to_string()))
        }

        async fn daily_summary(&self, _average_score: f64) -> Result<String, SentimentError> {
            Ok(String::new())
        }
    }

    /// Sentiment double whose scoring call never resolves.
    struct StalledSentiment;

    #[async_trait]
    impl SentimentService for StalledSentiment {
        async fn emotion_score(&self, _input: &str) -> Result<SentimentScore, SentimentError> {
            std::future::pending().await
        }

        async fn task_suggestion(
            &self,
            _emoji: &str,
            _description: &str,
            _score: SentimentScore,
        ) -> Result<String, SentimentError> {
            std::future::pending().await
        }

        async fn daily_summary(&self, _average_score: f64) -> Result<String, SentimentError> {
            std::future::pending().await
        }
    }

    fn pipeline_with(
        store: Arc<RecordingStore>,
        sentiment: Arc<RecordingSentiment>,
    ) -> CheckinPipeline {
        CheckinPipeline::new(store, sentiment)
    }

    fn score(value: i64) -> SentimentScore {
        SentimentScore::new(value).unwrap()
    }

    #[tokio::test]
    async fn empty_input_prompts_without_touching_collaborators() {
        let store = Arc::new(RecordingStore::default());
        let sentiment = Arc::new(RecordingSentiment::default());
        let pipeline = pipeline_with(store.clone(), sentiment.clone());
        let cancel = CancellationToken::new();

        for raw in ["", "   ", "\t\n"] {
            let reply = pipeline.handle("U123", raw, &cancel).await.unwrap();
            assert_eq!(reply, PROMPT_REPLY);
        }

        assert!(store.creates.lock().await.is_empty());
        assert!(sentiment.score_inputs.lock().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_token_maps_to_usage_reply() {
        let store = Arc::new(RecordingStore::default());
        let sentiment = Arc::new(RecordingSentiment::default());
        let pipeline = pipeline_with(store.clone(), sentiment.clone());
        let cancel = CancellationToken::new();

        let result = pipeline.handle("U123", "smile great day", &cancel).await;

        let error = result.unwrap_err();
        assert!(matches!(error, CheckinError::Usage(_)));
        assert_eq!(error.user_reply(), Some(USAGE_REPLY));
        assert!(store.creates.lock().await.is_empty());
        assert!(sentiment.score_inputs.lock().await.is_empty());
    }

    #[tokio::test]
    async fn missing_user_id_never_reaches_the_store() {
        let store = Arc::new(RecordingStore::default());
        let sentiment = Arc::new(RecordingSentiment::default());
        let pipeline = pipeline_with(store.clone(), sentiment.clone());
        let cancel = CancellationToken::new();

        let result = pipeline.handle("", ":smile: fine", &cancel).await;

        assert_eq!(result, Err(CheckinError::MissingUserId));
        assert_eq!(CheckinError::MissingUserId.user_reply(), None);
        assert!(store.creates.lock().await.is_empty());
        assert!(sentiment.score_inputs.lock().await.is_empty());
    }

    #[tokio::test]
    async fn create_failure_stops_before_sentiment() {
        let store = Arc::new(RecordingStore::default());
        store
            .create_results
            .lock()
            .await
            .push_back(Err(StoreError::Database("disk full".to_string())));
        let sentiment = Arc::new(RecordingSentiment::default());
        let pipeline = pipeline_with(store.clone(), sentiment.clone());
        let cancel = CancellationToken::new();

        let result = pipeline.handle("U123", ":frown: rough one", &cancel).await;

        let error = result.unwrap_err();
        assert!(matches!(error, CheckinError::CreateFailed(_)));
        assert_eq!(error.user_reply(), Some(CREATE_FAILED_REPLY));
        assert!(sentiment.score_inputs.lock().await.is_empty());
        assert!(store.updates.lock().await.is_empty());
    }

    #[tokio::test]
    async fn happy_path_scores_then_records_then_suggests() {
        let store = Arc::new(RecordingStore::default());
        let sentiment = Arc::new(RecordingSentiment::default());
        let pipeline = pipeline_with(store.clone(), sentiment.clone());
        let cancel = CancellationToken::new();

        let reply = pipeline
            .handle("U123", ":smile: had a great day", &cancel)
            .await
            .unwrap();

        assert_eq!(reply, "take a walk");

        let creates = store.creates.lock().await;
        assert_eq!(
            *creates,
            vec![CreateEmotionRequest {
                user_id: "U123".to_string(),
                emoji: ":smile:".to_string(),
                description: "had a great day".to_string(),
            }]
        );

        // Scoring sees the full raw input, not just the description.
        assert_eq!(
            *sentiment.score_inputs.lock().await,
            vec![":smile: had a great day".to_string()]
        );
        assert_eq!(
            *sentiment.suggestion_inputs.lock().await,
            vec![(
                ":smile:".to_string(),
                "had a great day".to_string(),
                score(85)
            )]
        );

        let updates = store.updates.lock().await;
        assert_eq!(
            *updates,
            vec![
                (EmotionId(1), UpdateEmotionRequest::with_score(score(85))),
                (EmotionId(1), UpdateEmotionRequest::with_task("take a walk")),
            ]
        );
    }

    #[tokio::test]
    async fn score_failure_leaves_record_unscored() {
        let store = Arc::new(RecordingStore::default());
        let sentiment = Arc::new(RecordingSentiment::default());
        sentiment
            .score_results
            .lock()
            .await
            .push_back(Err(SentimentError::EmptyResponse));
        let pipeline = pipeline_with(store.clone(), sentiment.clone());
        let cancel = CancellationToken::new();

        let result = pipeline.handle("U123", ":frown: meh", &cancel).await;

        let error = result.unwrap_err();
        assert!(matches!(error, CheckinError::ScoreFailed(_)));
        assert_eq!(error.user_reply(), Some(SCORE_FAILED_REPLY));
        assert_eq!(store.creates.lock().await.len(), 1);
        assert!(store.updates.lock().await.is_empty());
        assert!(sentiment.suggestion_inputs.lock().await.is_empty());
    }

    #[tokio::test]
    async fn score_update_failure_does_not_block_suggestion() {
        let store = Arc::new(RecordingStore::default());
        store
            .update_results
            .lock()
            .await
            .push_back(Err(StoreError::Database("locked".to_string())));
        let sentiment = Arc::new(RecordingSentiment::default());
        let pipeline = pipeline_with(store.clone(), sentiment.clone());
        let cancel = CancellationToken::new();

        let reply = pipeline
            .handle("U123", ":smile: all good", &cancel)
            .await
            .unwrap();

        assert_eq!(reply, "take a walk");
        assert_eq!(sentiment.suggestion_inputs.lock().await.len(), 1);
        // Both updates were attempted even though the first failed.
        assert_eq!(store.updates.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn task_update_failure_still_replies_with_task() {
        let store = Arc::new(RecordingStore::default());
        {
            let mut results = store.update_results.lock().await;
            results.push_back(Ok(()));
            results.push_back(Err(StoreError::Database("locked".to_string())));
        }
        let sentiment = Arc::new(RecordingSentiment::default());
        let pipeline = pipeline_with(store.clone(), sentiment.clone());
        let cancel = CancellationToken::new();

        let reply = pipeline
            .handle("U123", ":smile: all good", &cancel)
            .await
            .unwrap();

        assert_eq!(reply, "take a walk");
    }

    #[tokio::test]
    async fn suggestion_failure_keeps_score_but_aborts() {
        let store = Arc::new(RecordingStore::default());
        let sentiment = Arc::new(RecordingSentiment::default());
        sentiment
            .suggestion_results
            .lock()
            .await
            .push_back(Err(SentimentError::Upstream("503".to_string())));
        let pipeline = pipeline_with(store.clone(), sentiment.clone());
        let cancel = CancellationToken::new();

        let result = pipeline.handle("U123", ":smile: fine", &cancel).await;

        let error = result.unwrap_err();
        assert!(matches!(error, CheckinError::SuggestionFailed(_)));
        assert_eq!(error.user_reply(), Some(SUGGESTION_FAILED_REPLY));
        // The score update went through before the suggestion failed.
        let updates = store.updates.lock().await;
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.score, Some(score(85)));
    }

    #[tokio::test]
    async fn pre_cancelled_token_short_circuits() {
        let store = Arc::new(RecordingStore::default());
        let sentiment = Arc::new(RecordingSentiment::default());
        let pipeline = pipeline_with(store.clone(), sentiment.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = pipeline.handle("U123", ":smile: fine", &cancel).await;

        assert_eq!(result, Err(CheckinError::Cancelled));
        assert_eq!(CheckinError::Cancelled.user_reply(), None);
        assert!(store.creates.lock().await.is_empty());
        assert!(sentiment.score_inputs.lock().await.is_empty());
    }

    #[tokio::test]
    async fn cancellation_during_scoring_aborts_with_cancelled() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = CheckinPipeline::new(store.clone(), Arc::new(StalledSentiment));
        let cancel = CancellationToken::new();
        let pipeline_cancel = cancel.clone();

        let running =
            tokio::spawn(
                async move { pipeline.handle("U123", ":smile: fine", &pipeline_cancel).await },
            );
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let result = running.await.unwrap();
        assert_eq!(result, Err(CheckinError::Cancelled));
        // The record was created before scoring stalled; no updates followed.
        assert_eq!(store.creates.lock().await.len(), 1);
        assert!(store.updates.lock().await.is_empty());
    }

    #[test]
    fn reply_mapping_covers_the_error_taxonomy() {
        let usage = CheckinError::Usage(ParseError::InvalidEmoji {
            token: "smile".to_string(),
        });
        assert_eq!(usage.user_reply(), Some(USAGE_REPLY));

        let create = CheckinError::CreateFailed(StoreError::Database("down".to_string()));
        assert_eq!(create.user_reply(), Some(CREATE_FAILED_REPLY));

        let scoring = CheckinError::ScoreFailed(SentimentError::EmptyResponse);
        assert_eq!(scoring.user_reply(), Some(SCORE_FAILED_REPLY));

        let suggesting = CheckinError::SuggestionFailed(SentimentError::EmptyResponse);
        assert_eq!(suggesting.user_reply(), Some(SUGGESTION_FAILED_REPLY));

        assert_eq!(CheckinError::MissingUserId.user_reply(), None);
        assert_eq!(CheckinError::Cancelled.user_reply(), None);
    }
}
