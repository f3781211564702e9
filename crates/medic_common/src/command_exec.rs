//! CommandExec - run OS diagnostic and repair commands
//!
//! Everything that shells out goes through the `CommandRunner` trait so the
//! executor, health checks and diagnostics can be driven by a fake runner in
//! tests. A nonzero exit status is returned as data; only a command that
//! could not run to completion is an `ExecError`.

use crate::error::ExecError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Maximum output length to capture per stream
const MAX_OUTPUT_BYTES: usize = 64 * 1024; // 64KB

/// Default timeout for commands
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A single command: an argv vector, or a shell string when `shell` is set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub argv: Vec<String>,
    /// `argv[0]` is a shell string run via `sh -c` / `cmd /C`
    #[serde(default)]
    pub shell: bool,
}

impl CommandSpec {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            shell: false,
        }
    }

    pub fn shell(script: impl Into<String>) -> Self {
        Self {
            argv: vec![script.into()],
            shell: true,
        }
    }

    /// First token of the command
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Commands whose nonzero exit does not abort an action: argv commands
    /// running `timeout` or `sleep` (used as pauses between repair steps)
    pub fn is_best_effort(&self) -> bool {
        if self.shell {
            return false;
        }
        let Some(program) = self.program() else {
            return false;
        };
        let name = Path::new(program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(program)
            .to_lowercase();
        name.contains("timeout") || name == "sleep"
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv.join(" "))
    }
}

/// Captured result of a command that ran to completion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Command execution collaborator
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec, timeout: Duration)
        -> Result<CommandOutput, ExecError>;
}

#[async_trait]
impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    async fn run(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
    ) -> Result<CommandOutput, ExecError> {
        (**self).run(spec, timeout).await
    }
}

#[async_trait]
impl<T: CommandRunner + ?Sized> CommandRunner for Arc<T> {
    async fn run(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
    ) -> Result<CommandOutput, ExecError> {
        (**self).run(spec, timeout).await
    }
}

/// Runs commands on the real system with tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn build(spec: &CommandSpec) -> Result<Command, ExecError> {
        let (program, args) = spec.argv.split_first().ok_or(ExecError::Empty)?;

        let mut command = if spec.shell {
            let mut shell = if cfg!(windows) {
                let mut c = Command::new("cmd");
                c.arg("/C");
                c
            } else {
                let mut c = Command::new("sh");
                c.arg("-c");
                c
            };
            shell.arg(program);
            shell
        } else {
            let mut c = Command::new(program);
            c.args(args);
            c
        };

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(command)
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
    ) -> Result<CommandOutput, ExecError> {
        let mut command = Self::build(spec)?;
        debug!("Executing: {} (timeout {}s)", spec, timeout.as_secs());

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExecError::NotFound(
                    spec.program().unwrap_or_default().to_string(),
                ));
            }
            Ok(Err(e)) => {
                return Err(ExecError::Spawn {
                    command: spec.to_string(),
                    message: e.to_string(),
                });
            }
            // Dropping the output future kills the child
            Err(_) => {
                return Err(ExecError::Timeout {
                    command: spec.to_string(),
                    secs: timeout.as_secs(),
                });
            }
        };

        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: truncate_output(&output.stdout),
            stderr: truncate_output(&output.stderr),
        };
        debug!("{} exited with {}", spec, result.exit_code);
        Ok(result)
    }
}

fn truncate_output(bytes: &[u8]) -> String {
    let slice = if bytes.len() > MAX_OUTPUT_BYTES {
        &bytes[..MAX_OUTPUT_BYTES]
    } else {
        bytes
    };
    String::from_utf8_lossy(slice).to_string()
}
