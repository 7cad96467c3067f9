use std::process::ExitCode;

fn main() -> ExitCode {
    vibecheck_cli::run()
}
