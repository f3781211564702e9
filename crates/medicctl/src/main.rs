//! Medic Control - command line front end for medic
//!
//! Runs health checks, network diagnostics and guarded network repair.

use clap::Parser;
use medicctl::cli::Cli;
use medicctl::commands;
use medicctl::errors::{exit_code_for, EXIT_SUCCESS, EXIT_USAGE};
use medicctl::logging::{init_tracing, LogEntry};
use owo_colors::OwoColorize;
use std::time::Instant;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version also arrive here
            let code = if err.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.verbose);

    let started = Instant::now();
    let result = commands::dispatch(&cli).await;

    let (exit_code, error) = match result {
        Ok(code) => (code, None),
        Err(err) => {
            eprintln!("{} {:#}", "[ERROR]".bright_red(), err);
            (exit_code_for(&err), Some(format!("{:#}", err)))
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let entry = LogEntry::new(cli.command.name(), args, exit_code, started.elapsed(), error);
    if let Err(e) = entry.write() {
        tracing::debug!("Invocation log not written: {}", e);
    }

    std::process::exit(exit_code);
}
