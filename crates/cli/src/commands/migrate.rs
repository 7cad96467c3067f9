use vibecheck_core::config::{AppConfig, LoadOptions};
use vibecheck_db::{connect, migrations, PoolSettings};

use crate::commands::CommandResult;

pub fn run(rollback: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
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
                "migrate",
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

        let message = if rollback {
            let reverted = migrations::rollback_last(&pool)
                .await
                .map_err(|error| ("migration", error.to_string(), 5u8))?;
            match reverted {
                Some(version) => format!("reverted migration version {version}"),
                None => "no applied migrations to revert".to_string(),
            }
        } else {
            migrations::run_pending(&pool)
                .await
                .map_err(|error| ("migration", error.to_string(), 5u8))?;
            "applied pending migrations".to_string()
        };

        pool.close().await;
        Ok::<String, (&'static str, String, u8)>(message)
    });

    match result {
        Ok(message) => CommandResult::success("migrate", message),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
