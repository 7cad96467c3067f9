use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;
use vibecheck_core::SlackConfig;

const DEFAULT_BASE_URL: &str = "https://slack.com/api";
const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("chat transport failed: {0}")]
    Transport(String),
    #[error("slack web api rejected the message: {0}")]
    Api(String),
}

/// Posts bot replies into a channel.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn post_message(&self, channel_id: &str, text: &str) -> Result<(), ChatError>;
}

/// `chat.postMessage` client against the Slack Web API.
pub struct SlackApiClient {
    client: reqwest::Client,
    bot_token: SecretString,
    base_url: String,
}

impl SlackApiClient {
    pub fn new(config: &SlackConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            bot_token: config.bot_token.clone(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        })
    }

    /// Points the client at a different API host. Test hook.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }
}

#[async_trait]
impl ChatClient for SlackApiClient {
    async fn post_message(&self, channel_id: &str, text: &str) -> Result<(), ChatError> {
        let url = format!("{}/chat.postMessage", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.bot_token.expose_secret())
            .json(&json!({ "channel": channel_id, "text": text }))
            .send()
            .await
            .map_err(|error| ChatError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Api(format!("chat.postMessage returned http {status}")));
        }

        let body: Value =
            response.json().await.map_err(|error| ChatError::Transport(error.to_string()))?;
        if let Some(detail) = response_error(&body) {
            return Err(ChatError::Api(detail));
        }

        debug!(channel_id = %channel_id, "chat.postMessage accepted");
        Ok(())
    }
}

/// The Web API reports failures inside a 200 response; `ok` carries the verdict.
fn response_error(body: &Value) -> Option<String> {
    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        return None;
    }

    Some(
        body.get("error")
            .and_then(Value::as_str)
            .unwrap_or("slack api reported failure without an error code")
            .to_owned(),
    )
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;
    use vibecheck_core::SlackConfig;

    use super::{response_error, SlackApiClient};

    fn test_config() -> SlackConfig {
        SlackConfig {
            app_token: SecretString::from("xapp-test"),
            bot_token: SecretString::from("xoxb-test"),
        }
    }

    #[test]
    fn response_error_accepts_ok_payloads() {
        assert_eq!(response_error(&json!({ "ok": true, "ts": "1.2" })), None);
    }

    #[test]
    fn response_error_extracts_the_api_error_code() {
        let body = json!({ "ok": false, "error": "channel_not_found" });
        assert_eq!(response_error(&body).as_deref(), Some("channel_not_found"));
    }

    #[test]
    fn response_error_reports_missing_error_codes() {
        let body = json!({ "ok": false });
        assert_eq!(
            response_error(&body).as_deref(),
            Some("slack api reported failure without an error code")
        );
    }

    #[test]
    fn with_base_url_trims_trailing_slashes() {
        let client = SlackApiClient::new(&test_config())
            .expect("build client")
            .with_base_url("http://localhost:9999/");
        assert_eq!(client.base_url, "http://localhost:9999");
    }
}
