/*
 * main.rs
 *
 * Parse args, call runner, translate status. Boring on purpose.
 * The interesting stuff is in runner.rs.
 *
 * Our own failures exit 125 so they can't be mistaken for the command's.
 * That includes clap's usage errors, which would otherwise exit 2.
 */

use clap::Parser;
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;

use escalating_timeout::args::Args;
use escalating_timeout::error::exit_codes;
use escalating_timeout::runner::{RunConfig, run_command};
use escalating_timeout::status::translate;

/* debug output: TIMEOUT_LOG=debug timeout 5 cmd */
const LOG_ENV: &str = "TIMEOUT_LOG";

fn main() {
    std::process::exit(i32::from(run_main()));
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_main() -> u8 {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => exit_codes::INTERNAL_ERROR,
            };
        }
    };

    init_tracing();
    tracing::debug!(?args, "parsed arguments");

    let config = match RunConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("timeout: {e}");
            if e.is_usage() {
                eprintln!("Try 'timeout --help' for more information.");
            }
            return e.exit_code();
        }
    };

    match run_command(&config) {
        Ok(result) => {
            let verdict = translate(&result, &config.command.join(" "));
            if let Some(line) = verdict.diagnostic {
                eprintln!("{line}");
            }
            verdict.code
        }
        Err(e) => {
            eprintln!("timeout: {e}");
            e.exit_code()
        }
    }
}
