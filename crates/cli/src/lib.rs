pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "vibecheck",
    about = "Vibecheck operator CLI",
    long_about = "Operate vibecheck runtime readiness, migrations, config inspection, and check-in summaries.",
    after_help = "Examples:\n  vibecheck doctor --json\n  vibecheck config\n  vibecheck summary --window-hours 24"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run startup preflight checks and return structured status output")]
    Start,
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate {
        #[arg(long, help = "Revert the most recently applied migration instead of applying")]
        rollback: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, credential readiness, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Summarize the recent check-in mood through the sentiment service")]
    Summary {
        #[arg(long, default_value_t = 24, help = "How many hours of check-ins to include")]
        window_hours: u32,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start => commands::start::run(),
        Command::Migrate { rollback } => commands::migrate::run(rollback),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Summary { window_hours } => commands::summary::run(window_hours),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
