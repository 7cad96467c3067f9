mod bootstrap;
mod health;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vibecheck_core::config::{AppConfig, ConfigOverrides, LoadOptions};

use crate::bootstrap::Application;

#[derive(Debug, Parser)]
#[command(name = "vibecheck-server", about = "Vibecheck Slack bot server")]
struct Args {
    /// Config file to load. Without this flag the standard lookup
    /// locations are tried and a missing file falls back to defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `database.url`.
    #[arg(long)]
    database_url: Option<String>,

    /// Overrides `logging.level`.
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn load_options(self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config,
            overrides: ConfigOverrides {
                database_url: self.database_url,
                log_level: self.log_level,
                ..ConfigOverrides::default()
            },
        }
    }
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;
    use vibecheck_core::config::LogFormat::*;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run(Args::parse()).await
}

pub async fn run(args: Args) -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(args.load_options())?;
    init_logging(&config);

    // Now bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let cancel = CancellationToken::new();

    let Application { db_pool, slack_runner, .. } = app;
    let runner_cancel = cancel.clone();
    let mut runner = tokio::spawn(async move { slack_runner.run(&runner_cancel).await });

    info!(event_name = "system.server.started", "vibecheck-server started");

    wait_for_shutdown().await?;

    info!(
        event_name = "system.server.stopping",
        grace_secs = grace.as_secs(),
        "shutdown signal received; draining in-flight check-ins"
    );
    cancel.cancel();

    match tokio::time::timeout(grace, &mut runner).await {
        Ok(Ok(Ok(()))) => {
            info!(event_name = "system.server.stopped", "socket mode runner stopped cleanly");
        }
        Ok(Ok(Err(error))) => {
            warn!(
                event_name = "system.server.stopped",
                error = %error,
                "socket mode runner stopped with an error"
            );
        }
        Ok(Err(join_error)) => {
            warn!(
                event_name = "system.server.stopped",
                error = %join_error,
                "socket mode runner task failed"
            );
        }
        Err(_) => {
            warn!(
                event_name = "system.server.stopped",
                grace_secs = grace.as_secs(),
                "grace period elapsed before the runner stopped; aborting it"
            );
            runner.abort();
        }
    }

    db_pool.close().await;
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
