//! REST client for the Gemini `generateContent` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use vibecheck_core::config::GeminiConfig;
use vibecheck_core::domain::SentimentScore;
use vibecheck_core::sentiment::{SentimentError, SentimentService};

use crate::prompts;

const BASE_BACKOFF_MS: u64 = 250;
const MAX_BACKOFF_MS: u64 = 2_000;

/// Request-level failures, kept private so retry classification stays local.
#[derive(Debug, Error)]
enum RequestError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("gemini returned status {code}: {detail}")]
    Status { code: u16, detail: String },
    #[error("gemini returned no usable content")]
    Empty,
}

impl RequestError {
    /// Transport faults and throttling/server statuses are worth retrying;
    /// everything else is a terminal answer from the API.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { code, .. } => *code == 429 || *code >= 500,
            Self::Empty => false,
        }
    }
}

impl From<RequestError> for SentimentError {
    fn from(error: RequestError) -> Self {
        match error {
            RequestError::Empty => SentimentError::EmptyResponse,
            other => SentimentError::Upstream(other.to_string()),
        }
    }
}

/// `SentimentService` over the Gemini REST API.
pub struct GeminiService {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    max_retries: u32,
}

impl GeminiService {
    pub fn new(config: &GeminiConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
        })
    }

    /// Sends one prompt and returns the reply text, retrying transient
    /// failures up to the configured budget. Parse and validation problems
    /// are never retried.
    async fn generate(&self, prompt: &str) -> Result<String, SentimentError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let mut attempt = 0;
        loop {
            match self.send(&url, &payload).await {
                Ok(text) => return Ok(text),
                Err(error) if error.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        event_name = "sentiment.gemini.retry",
                        attempt,
                        error = %error,
                        "retrying gemini request"
                    );
                    tokio::time::sleep(backoff(attempt)).await;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    async fn send(&self, url: &str, payload: &Value) -> Result<String, RequestError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(payload)
            .send()
            .await
            .map_err(|err| RequestError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.text().await {
                Ok(raw) => serde_json::from_str::<Value>(&raw)
                    .map(|body| error_detail(&body))
                    .unwrap_or(raw),
                Err(_) => "no error detail".to_string(),
            };
            return Err(RequestError::Status { code: status.as_u16(), detail });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| RequestError::Transport(err.to_string()))?;

        extract_text(&body).ok_or(RequestError::Empty)
    }
}

#[async_trait]
impl SentimentService for GeminiService {
    async fn emotion_score(&self, input: &str) -> Result<SentimentScore, SentimentError> {
        let reply = self.generate(&prompts::emotion_score(input)).await?;
        let score = parse_score(&reply)?;
        debug!(event_name = "sentiment.gemini.scored", score = %score, "emotion scored");
        Ok(score)
    }

    async fn task_suggestion(
        &self,
        emoji: &str,
        description: &str,
        score: SentimentScore,
    ) -> Result<String, SentimentError> {
        self.generate(&prompts::task_suggestion(emoji, description, score)).await
    }

    async fn daily_summary(&self, average_score: f64) -> Result<String, SentimentError> {
        self.generate(&prompts::daily_summary(average_score)).await
    }
}

/// Concatenates the text parts of the first candidate and trims the result.
/// `None` when the response carries no usable text.
fn extract_text(body: &Value) -> Option<String> {
    let parts = body.get("candidates")?.get(0)?.get("content")?.get("parts")?.as_array()?;

    let mut text = String::new();
    for part in parts {
        if let Some(fragment) = part.get("text").and_then(Value::as_str) {
            text.push_str(fragment);
        }
    }

    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parses the model's reply as a score, tolerating surrounding whitespace.
fn parse_score(text: &str) -> Result<SentimentScore, SentimentError> {
    let trimmed = text.trim();
    let value: i64 =
        trimmed.parse().map_err(|_| SentimentError::MalformedScore(trimmed.to_string()))?;
    Ok(SentimentScore::new(value)?)
}

fn error_detail(body: &Value) -> String {
    body.get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("no error detail")
        .to_string()
}

fn backoff(attempt: u32) -> Duration {
    let exponent = attempt.min(16);
    let multiplier = 1u64 << exponent;
    let delay_ms = BASE_BACKOFF_MS.saturating_mul(multiplier).min(MAX_BACKOFF_MS);
    Duration::from_millis(delay_ms)
}
