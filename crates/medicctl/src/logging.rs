//! Logging for medicctl
//!
//! Diagnostics go to stderr through tracing. Each invocation also appends one
//! JSON line to an XDG state file so past runs can be audited.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the invocation log location
pub const LOG_FILE_ENV: &str = "MEDICCTL_LOG_FILE";

/// Install the stderr subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Log entry for each medicctl invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 timestamp
    pub ts: String,

    /// Request ID (UUID)
    pub req_id: String,

    /// Subcommand name
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    pub exit_code: i32,

    pub duration_ms: u64,

    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogEntry {
    pub fn new(
        command: &str,
        args: Vec<String>,
        exit_code: i32,
        duration: Duration,
        error: Option<String>,
    ) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339(),
            req_id: uuid::Uuid::new_v4().to_string(),
            command: command.to_string(),
            args,
            exit_code,
            duration_ms: duration.as_millis() as u64,
            ok: error.is_none(),
            error,
        }
    }

    /// Log file path with fallback chain
    ///
    /// Priority:
    /// 1. $MEDICCTL_LOG_FILE (explicit override)
    /// 2. $XDG_STATE_HOME/medic/ctl.jsonl
    /// 3. ~/.local/state/medic/ctl.jsonl
    pub fn discover_log_path() -> Option<PathBuf> {
        log_path_from(|key| std::env::var(key).ok())
    }

    /// Append to the log file. Callers ignore failures; logging never
    /// changes the outcome of a command.
    pub fn write(&self) -> std::io::Result<()> {
        let path = Self::discover_log_path()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        self.write_to(&path)
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

fn log_path_from(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

    if let Some(path) = non_empty(LOG_FILE_ENV) {
        return Some(PathBuf::from(path));
    }
    if let Some(state) = non_empty("XDG_STATE_HOME") {
        return Some(PathBuf::from(state).join("medic").join("ctl.jsonl"));
    }
    non_empty("HOME").map(|home| PathBuf::from(home).join(".local/state/medic/ctl.jsonl"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_log_path_priority() {
        let all = lookup(&[
            (LOG_FILE_ENV, "/tmp/explicit.jsonl"),
            ("XDG_STATE_HOME", "/state"),
            ("HOME", "/home/u"),
        ]);
        assert_eq!(log_path_from(all), Some(PathBuf::from("/tmp/explicit.jsonl")));

        let xdg = lookup(&[("XDG_STATE_HOME", "/state"), ("HOME", "/home/u")]);
        assert_eq!(log_path_from(xdg), Some(PathBuf::from("/state/medic/ctl.jsonl")));

        let home = lookup(&[("XDG_STATE_HOME", ""), ("HOME", "/home/u")]);
        assert_eq!(
            log_path_from(home),
            Some(PathBuf::from("/home/u/.local/state/medic/ctl.jsonl"))
        );

        assert_eq!(log_path_from(lookup(&[])), None);
    }

    #[test]
    fn test_entries_append_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/ctl.jsonl");

        let ok = LogEntry::new("health", vec![], 0, Duration::from_millis(12), None);
        let failed = LogEntry::new(
            "config",
            vec!["--init".to_string()],
            78,
            Duration::from_millis(3),
            Some("bad config".to_string()),
        );
        ok.write_to(&path).unwrap();
        failed.write_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(!lines[0].contains("\"error\""));

        let parsed: LogEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, failed);
        assert!(!parsed.ok);
        assert_eq!(parsed.duration_ms, 3);
    }
}
