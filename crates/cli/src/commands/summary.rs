use chrono::{Duration, Utc};
use vibecheck_ai::GeminiService;
use vibecheck_core::config::{AppConfig, LoadOptions};
use vibecheck_core::{EmotionStore, SentimentService};
use vibecheck_db::{connect, PoolSettings, SqlEmotionStore};

use crate::commands::CommandResult;

pub fn run(window_hours: u32) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "summary",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "summary",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database.url, PoolSettings::from(&config.database))
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let store = SqlEmotionStore::new(pool.clone());
        let cutoff = Utc::now() - Duration::hours(i64::from(window_hours));
        let average = store
            .average_score_since(cutoff)
            .await
            .map_err(|error| ("db_query", error.to_string(), 4u8))?;
        pool.close().await;

        let Some(average) = average else {
            return Ok(format!("no scored check-ins in the last {window_hours}h"));
        };

        let sentiment = GeminiService::new(&config.gemini)
            .map_err(|error| ("ai_client", error.to_string(), 6u8))?;
        let text = sentiment
            .daily_summary(average)
            .await
            .map_err(|error| ("ai_upstream", error.to_string(), 6u8))?;

        Ok::<String, (&'static str, String, u8)>(format!(
            "average score {average:.2} over the last {window_hours}h: {text}"
        ))
    });

    match result {
        Ok(message) => CommandResult::success("summary", message),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("summary", error_class, message, exit_code)
        }
    }
}
