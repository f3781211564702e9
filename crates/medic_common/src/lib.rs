//! Medic Common - shared checks, diagnostics and remediation for medic
//!
//! Everything the `medicctl` front end needs lives here: the severity rollup
//! used by health and performance reports, the guarded remediation executor,
//! network diagnostics and repair, the system inventory, platform detection
//! and configuration.

pub mod command_exec;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod health;
pub mod inventory;
pub mod network;
pub mod network_repair;
pub mod performance;
pub mod platform;
pub mod remediation;
pub mod severity;

pub use command_exec::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use config::MedicConfig;
pub use confirmation::{Confirmer, Decision, PolicyConfirmer, TerminalConfirmer};
pub use error::{ExecError, MedicError};
pub use platform::{OsInfo, PlatformId};
pub use remediation::{
    ActionGroup, ExecutorOptions, FixOutcome, FixResult, FixSession, RemediationAction,
    RemediationExecutor,
};
pub use severity::{aggregate, Aggregator, Severity};

/// Format bytes into a human readable string (e.g. "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{:.1} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.1} PB", value)
}

/// Current local time in RFC 3339 format
pub fn timestamp() -> String {
    chrono::Local::now().to_rfc3339()
}
