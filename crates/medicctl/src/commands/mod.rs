//! Command implementations
//!
//! Each command returns the process exit code on success. Failures bubble up
//! as `anyhow::Error` and are mapped by `errors::exit_code_for`.

pub mod analyze;
pub mod config;
pub mod diagnose;
pub mod health;
pub mod info;
pub mod repair;

use crate::cli::{Cli, Commands};
use anyhow::{Context as _, Result};
use medic_common::MedicConfig;
use std::path::Path;

/// What every command gets besides its own arguments
pub struct Context {
    pub config: MedicConfig,
    pub json: bool,
}

/// `--config` wins; otherwise the user, then system config, then defaults
pub fn load_config(path: Option<&Path>) -> Result<MedicConfig> {
    match path {
        Some(path) => MedicConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => MedicConfig::load().context("Failed to load configuration"),
    }
}

pub async fn dispatch(cli: &Cli) -> Result<i32> {
    if let Commands::Config { init: true, force } = &cli.command {
        return config::init(cli.config.as_deref(), *force);
    }

    let config = load_config(cli.config.as_deref())?;
    crate::output::init_color(config.output.color);
    let ctx = Context {
        config,
        json: cli.json,
    };

    match &cli.command {
        Commands::Health {
            services,
            ports,
            hosts,
        } => health::run(&ctx, services, ports, hosts).await,
        Commands::Diagnose { hosts } => diagnose::run(&ctx, hosts).await,
        Commands::Repair(args) => repair::run(&ctx, args).await,
        Commands::Analyze { top } => analyze::run(&ctx, *top).await,
        Commands::Info {
            top,
            log_lines,
            output,
        } => info::run(&ctx, *top, *log_lines, output.as_deref()).await,
        Commands::Config { .. } => config::show(&ctx),
    }
}
