use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use vibecheck_core::domain::{
    CreateEmotionRequest, Emotion, EmotionId, SentimentScore, UpdateEmotionRequest,
};
use vibecheck_core::store::{EmotionStore, StoreError};

use crate::DbPool;

const SELECT_COLUMNS: &str = "id, user_id, emoji, description, score, messaged_at, task, \
                              task_completed_at, created_at, updated_at";

/// `EmotionStore` backed by the `emotions` table.
pub struct SqlEmotionStore {
    pool: DbPool,
}

impl SqlEmotionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Reads a single record back, `None` when the id is unknown.
    pub async fn find_emotion(&self, id: EmotionId) -> Result<Option<Emotion>, StoreError> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM emotions WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_error)?;

        row.as_ref().map(row_to_emotion).transpose()
    }
}

#[async_trait]
impl EmotionStore for SqlEmotionStore {
    async fn create_emotion(&self, request: CreateEmotionRequest) -> Result<EmotionId, StoreError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO emotions (created_at, updated_at, user_id, emoji, description)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&now)
        .bind(&now)
        .bind(&request.user_id)
        .bind(&request.emoji)
        .bind(&request.description)
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(EmotionId(result.last_insert_rowid()))
    }

    async fn update_emotion(
        &self,
        id: EmotionId,
        patch: UpdateEmotionRequest,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend_error)?;

        let query = format!("SELECT {SELECT_COLUMNS} FROM emotions WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend_error)?;
        let Some(row) = row else {
            return Err(StoreError::NotFound { id });
        };
        let mut emotion = row_to_emotion(&row)?;

        if let Some(emoji) = patch.emoji {
            emotion.emoji = emoji;
        }
        if let Some(description) = patch.description {
            emotion.description = description;
        }
        if let Some(score) = patch.score {
            emotion.score = Some(score);
        }
        if let Some(messaged_at) = patch.messaged_at {
            emotion.messaged_at = Some(messaged_at);
        }
        if let Some(task) = patch.task {
            emotion.task = Some(task);
        }
        if let Some(task_completed_at) = patch.task_completed_at {
            emotion.task_completed_at = Some(task_completed_at);
        }

        sqlx::query(
            "UPDATE emotions
             SET emoji = ?, description = ?, score = ?, messaged_at = ?, task = ?,
                 task_completed_at = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&emotion.emoji)
        .bind(&emotion.description)
        .bind(emotion.score.map(i64::from))
        .bind(emotion.messaged_at.map(|at| at.to_rfc3339()))
        .bind(&emotion.task)
        .bind(emotion.task_completed_at.map(|at| at.to_rfc3339()))
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&mut *tx)
        .await
        .map_err(backend_error)?;

        tx.commit().await.map_err(backend_error)
    }

    async fn average_score_since(&self, since: DateTime<Utc>) -> Result<Option<f64>, StoreError> {
        let average: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(score) FROM emotions WHERE score IS NOT NULL AND created_at >= ?",
        )
        .bind(since.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(average)
    }
}

fn row_to_emotion(row: &SqliteRow) -> Result<Emotion, StoreError> {
    let score = row
        .try_get::<Option<i64>, _>("score")
        .map_err(decode_error)?
        .map(|value| SentimentScore::new(value).map_err(|err| StoreError::Decode(err.to_string())))
        .transpose()?;

    Ok(Emotion {
        id: EmotionId(row.try_get("id").map_err(decode_error)?),
        user_id: row.try_get("user_id").map_err(decode_error)?,
        emoji: row.try_get("emoji").map_err(decode_error)?,
        description: row.try_get("description").map_err(decode_error)?,
        score,
        messaged_at: parse_optional_timestamp(row, "messaged_at")?,
        task: row.try_get("task").map_err(decode_error)?,
        task_completed_at: parse_optional_timestamp(row, "task_completed_at")?,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, StoreError> {
    let raw: String = row.try_get(column).map_err(decode_error)?;
    parse_rfc3339(column, &raw)
}

fn parse_optional_timestamp(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    let raw: Option<String> = row.try_get(column).map_err(decode_error)?;
    raw.map(|value| parse_rfc3339(column, &value)).transpose()
}

fn parse_rfc3339(column: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| StoreError::Decode(format!("column `{column}`: {err}")))
}

fn backend_error(error: sqlx::Error) -> StoreError {
    StoreError::Database(error.to_string())
}

fn decode_error(error: sqlx::Error) -> StoreError {
    StoreError::Decode(error.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::connection::{connect, PoolSettings};
    use crate::migrations::run_pending;

    async fn setup_store() -> SqlEmotionStore {
        let pool = connect(
            "sqlite::memory:",
            PoolSettings { max_connections: 1, acquire_timeout_secs: 30 },
        )
        .await
        .expect("connect");
        run_pending(&pool).await.expect("run migrations");
        SqlEmotionStore::new(pool)
    }

    fn create_request(user_id: &str, emoji: &str, description: &str) -> CreateEmotionRequest {
        CreateEmotionRequest {
            user_id: user_id.to_string(),
            emoji: emoji.to_string(),
            description: description.to_string(),
        }
    }

    fn score(value: i64) -> SentimentScore {
        SentimentScore::new(value).expect("score in range")
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids_and_timestamps() {
        let store = setup_store().await;

        let first = store
            .create_emotion(create_request("U1", ":smile:", "had a great day"))
            .await
            .expect("create first");
        let second = store
            .create_emotion(create_request("U2", ":frown:", ""))
            .await
            .expect("create second");

        assert_eq!(first, EmotionId(1));
        assert_eq!(second, EmotionId(2));

        let emotion = store.find_emotion(first).await.expect("find").expect("exists");
        assert_eq!(emotion.user_id, "U1");
        assert_eq!(emotion.emoji, ":smile:");
        assert_eq!(emotion.description, "had a great day");
        assert_eq!(emotion.score, None);
        assert_eq!(emotion.task, None);
        assert_eq!(emotion.messaged_at, None);
        assert_eq!(emotion.created_at, emotion.updated_at);
    }

    #[tokio::test]
    async fn update_patches_only_provided_fields() {
        let store = setup_store().await;
        let id = store
            .create_emotion(create_request("U1", ":smile:", "had a great day"))
            .await
            .expect("create");

        store
            .update_emotion(id, UpdateEmotionRequest::with_score(score(85)))
            .await
            .expect("score update");

        let emotion = store.find_emotion(id).await.expect("find").expect("exists");
        assert_eq!(emotion.score, Some(score(85)));
        assert_eq!(emotion.emoji, ":smile:");
        assert_eq!(emotion.description, "had a great day");
        assert_eq!(emotion.task, None);

        store
            .update_emotion(id, UpdateEmotionRequest::with_task("take a walk"))
            .await
            .expect("task update");

        let emotion = store.find_emotion(id).await.expect("find").expect("exists");
        assert_eq!(emotion.task.as_deref(), Some("take a walk"));
        assert_eq!(emotion.score, Some(score(85)));
        assert!(emotion.updated_at >= emotion.created_at);
    }

    #[tokio::test]
    async fn update_round_trips_every_field() {
        let store = setup_store().await;
        let id = store
            .create_emotion(create_request("U1", ":neutral_face:", "so-so"))
            .await
            .expect("create");

        let messaged_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
        let completed_at = Utc.with_ymd_and_hms(2026, 3, 1, 17, 0, 0).unwrap();
        store
            .update_emotion(
                id,
                UpdateEmotionRequest {
                    emoji: Some(":grin:".to_string()),
                    description: Some("improved".to_string()),
                    score: Some(score(72)),
                    messaged_at: Some(messaged_at),
                    task: Some("stretch for five minutes".to_string()),
                    task_completed_at: Some(completed_at),
                },
            )
            .await
            .expect("full update");

        let emotion = store.find_emotion(id).await.expect("find").expect("exists");
        assert_eq!(emotion.emoji, ":grin:");
        assert_eq!(emotion.description, "improved");
        assert_eq!(emotion.score, Some(score(72)));
        assert_eq!(emotion.messaged_at, Some(messaged_at));
        assert_eq!(emotion.task.as_deref(), Some("stretch for five minutes"));
        assert_eq!(emotion.task_completed_at, Some(completed_at));
    }

    #[tokio::test]
    async fn update_unknown_id_reports_not_found() {
        let store = setup_store().await;

        let result = store
            .update_emotion(EmotionId(999), UpdateEmotionRequest::with_score(score(50)))
            .await;

        assert_eq!(result, Err(StoreError::NotFound { id: EmotionId(999) }));
    }

    #[tokio::test]
    async fn check_constraints_reject_empty_identity() {
        let store = setup_store().await;

        let empty_user = store.create_emotion(create_request("", ":smile:", "")).await;
        assert!(matches!(empty_user, Err(StoreError::Database(_))));

        let empty_emoji = store.create_emotion(create_request("U1", "", "")).await;
        assert!(matches!(empty_emoji, Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn average_score_respects_cutoff_and_unscored_rows() {
        let store = setup_store().await;
        let an_hour_ago = Utc::now() - Duration::hours(1);

        assert_eq!(store.average_score_since(an_hour_ago).await.expect("average"), None);

        let first = store
            .create_emotion(create_request("U1", ":smile:", ""))
            .await
            .expect("create");
        let second = store
            .create_emotion(create_request("U2", ":frown:", ""))
            .await
            .expect("create");
        // Third row stays unscored and must not drag the average down.
        store
            .create_emotion(create_request("U3", ":neutral_face:", ""))
            .await
            .expect("create");

        store
            .update_emotion(first, UpdateEmotionRequest::with_score(score(80)))
            .await
            .expect("score first");
        store
            .update_emotion(second, UpdateEmotionRequest::with_score(score(60)))
            .await
            .expect("score second");

        let average = store
            .average_score_since(an_hour_ago)
            .await
            .expect("average")
            .expect("scored rows in window");
        assert!((average - 70.0).abs() < f64::EPSILON);

        let in_the_future = Utc::now() + Duration::hours(1);
        assert_eq!(store.average_score_since(in_the_future).await.expect("average"), None);
    }
}
