//! Error types for medic.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a command runner.
///
/// A nonzero exit status is NOT an error at this layer; only a command that
/// could not be run to completion is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("Command timed out after {secs}s: {command}")]
    Timeout { command: String, secs: u64 },

    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Empty command")]
    Empty,

    #[error("Failed to run {command}: {message}")]
    Spawn { command: String, message: String },
}

#[derive(Error, Debug)]
pub enum MedicError {
    #[error("Failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Cannot determine home directory")]
    NoHomeDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Command error: {0}")]
    Exec(#[from] ExecError),
}

impl MedicError {
    /// True for errors caused by a bad or unreadable configuration file
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            MedicError::ConfigRead { .. }
                | MedicError::ConfigParse { .. }
                | MedicError::ConfigSerialize(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MedicError>;
