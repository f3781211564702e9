//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Medic CLI
#[derive(Debug, Parser)]
#[command(name = "medicctl")]
#[command(
    about = "Medic - system health checks, network diagnostics and guarded repair",
    long_about = None
)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a config file (overrides the user and system config)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print machine readable JSON instead of a summary
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check disk, memory, load, services, ports and remote hosts
    Health {
        /// Service to check (repeatable)
        #[arg(long = "service", value_name = "NAME")]
        services: Vec<String>,

        /// Local TCP port expected to be listening (repeatable)
        #[arg(long = "port", value_name = "PORT")]
        ports: Vec<u16>,

        /// Remote host[:port] to probe (repeatable)
        #[arg(long = "host", value_name = "HOST")]
        hosts: Vec<String>,
    },

    /// Run network diagnostics
    Diagnose {
        /// Hosts to ping, comma separated
        #[arg(long, value_delimiter = ',')]
        hosts: Vec<String>,
    },

    /// Diagnose the network and run fixes for what is broken
    Repair(RepairArgs),

    /// Analyze performance bottlenecks and resource hogs
    Analyze {
        /// Number of top processes to list
        #[arg(long, value_name = "N")]
        top: Option<usize>,
    },

    /// Report hardware, storage, processes, services and recent logs
    Info {
        /// Number of top processes to list
        #[arg(long, value_name = "N")]
        top: Option<usize>,

        /// Number of recent log lines to include
        #[arg(long, value_name = "N")]
        log_lines: Option<usize>,

        /// Write the full JSON report to a file
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Write a default config file
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct RepairArgs {
    /// Hosts to ping, comma separated
    #[arg(long, value_delimiter = ',')]
    pub hosts: Vec<String>,

    /// Actually run commands (default is a dry run)
    #[arg(long)]
    pub execute: bool,

    /// Run destructive fixes without asking
    #[arg(long)]
    pub auto_approve_destructive: bool,

    /// Maximum diagnose/repair passes
    #[arg(long, value_name = "N")]
    pub max_passes: Option<u32>,

    /// Skip the initial diagnosis and treat the network as broken
    #[arg(long)]
    pub skip_diagnostics: bool,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// How to answer destructive prompts
    #[arg(long, value_enum, default_value_t = DestructivePolicy::Ask)]
    pub on_destructive: DestructivePolicy,
}

/// Answer source for destructive operation prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DestructivePolicy {
    /// Prompt on the terminal
    Ask,
    /// Decline every destructive fix
    Decline,
    /// Skip every destructive fix
    Skip,
}

impl Commands {
    /// Name recorded in the invocation log
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Health { .. } => "health",
            Commands::Diagnose { .. } => "diagnose",
            Commands::Repair(_) => "repair",
            Commands::Analyze { .. } => "analyze",
            Commands::Info { .. } => "info",
            Commands::Config { .. } => "config",
        }
    }
}
