//! Assembles the running application: config, database, AI client, and the
//! Slack socket runner, wired in dependency order.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use vibecheck_ai::GeminiService;
use vibecheck_core::config::{AppConfig, ConfigError, LoadOptions};
use vibecheck_core::CheckinPipeline;
use vibecheck_db::{connect, migrations, DbPool, PoolSettings, SqlEmotionStore};
use vibecheck_slack::chat::SlackApiClient;
use vibecheck_slack::events::{EventDispatcher, SlashCommandHandler};
use vibecheck_slack::socket::{NoopSocketTransport, ReconnectPolicy, SocketModeRunner};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("sentiment client construction failed: {0}")]
    SentimentClient(#[source] reqwest::Error),
    #[error("chat client construction failed: {0}")]
    ChatClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Bootstraps from an already-loaded config so callers can initialize
/// logging between the load and the first bootstrap log line.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect(&config.database.url, PoolSettings::from(&config.database))
        .await
        .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let store = Arc::new(SqlEmotionStore::new(db_pool.clone()));
    let sentiment =
        Arc::new(GeminiService::new(&config.gemini).map_err(BootstrapError::SentimentClient)?);
    let pipeline = CheckinPipeline::new(store, sentiment);

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(pipeline));

    let chat = Arc::new(SlackApiClient::new(&config.slack).map_err(BootstrapError::ChatClient)?);

    let slack_runner = SocketModeRunner::new(
        Arc::new(NoopSocketTransport),
        Arc::new(dispatcher),
        chat,
        ReconnectPolicy::default(),
    );
    info!(
        event_name = "system.bootstrap.slack_runner_ready",
        transport = "noop",
        command = vibecheck_slack::commands::CHECKIN_COMMAND,
        "socket mode runner assembled"
    );

    Ok(Application { config, db_pool, slack_runner })
}
