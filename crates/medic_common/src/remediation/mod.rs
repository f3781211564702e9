//! Remediation - guarded execution of repair actions
//!
//! A pass walks ordered groups of actions and records exactly one `FixResult`
//! per action. Actions named in the destructive table must be confirmed
//! (approve / decline / skip) unless the run is a dry run or destructive
//! operations are auto-approved. Nothing that goes wrong inside an action
//! escapes the pass: failures become records.

pub mod catalog;
pub mod destructive;

use crate::command_exec::{CommandRunner, CommandSpec, DEFAULT_TIMEOUT_SECS};
use crate::confirmation::{ConfirmRequest, Confirmer, Decision};
use crate::error::ExecError;
use crate::platform::PlatformId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use destructive::{DestructiveOperation, RiskRating};

/// Output recorded for an action skipped at the prompt
pub const SKIPPED_OUTPUT: &str = "Skipped by user request";

/// Issue category that causes a group of actions to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    DnsFailures,
    PingFailures,
    InterfaceError,
    WindowsHost,
}

impl Trigger {
    pub fn label(&self) -> &'static str {
        match self {
            Self::DnsFailures => "DNS",
            Self::PingFailures => "connectivity",
            Self::InterfaceError => "interface",
            Self::WindowsHost => "Windows-specific",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One remediation step with per-platform command lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationAction {
    pub name: String,
    pub description: String,
    /// Lower runs first within a group
    pub priority: u32,
    pub requires_admin: bool,
    pub commands: BTreeMap<PlatformId, Vec<CommandSpec>>,
}

impl RemediationAction {
    pub fn new(name: impl Into<String>, description: impl Into<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            priority,
            requires_admin: false,
            commands: BTreeMap::new(),
        }
    }

    pub fn with_admin(mut self) -> Self {
        self.requires_admin = true;
        self
    }

    /// Set the command list for one platform
    pub fn on(mut self, platform: PlatformId, commands: Vec<CommandSpec>) -> Self {
        self.commands.insert(platform, commands);
        self
    }

    /// Commands for `platform`, None when there are none
    pub fn commands_for(&self, platform: PlatformId) -> Option<&[CommandSpec]> {
        self.commands
            .get(&platform)
            .map(Vec::as_slice)
            .filter(|cmds| !cmds.is_empty())
    }

    pub fn destructive(&self) -> Option<&'static DestructiveOperation> {
        destructive::lookup(&self.name)
    }
}

/// Actions that run together for one trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionGroup {
    pub trigger: Trigger,
    pub actions: Vec<RemediationAction>,
}

impl ActionGroup {
    pub fn new(trigger: Trigger, actions: Vec<RemediationAction>) -> Self {
        Self { trigger, actions }
    }

    /// Actions by ascending priority, ties keep catalog order
    pub fn sorted_actions(&self) -> Vec<&RemediationAction> {
        let mut actions: Vec<&RemediationAction> = self.actions.iter().collect();
        actions.sort_by_key(|a| a.priority);
        actions
    }
}

/// Final state of one attempted action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixOutcome {
    Succeeded,
    Failed,
    Skipped,
    Declined,
}

/// Record of one attempted action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixResult {
    pub name: String,
    pub description: String,
    pub priority: u32,
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub dry_run: bool,
    /// Wall-clock seconds, rounded to 2 decimals
    pub execution_time_secs: f64,
    pub skipped: bool,
    pub user_declined: bool,
}

impl FixResult {
    fn pending(action: &RemediationAction, dry_run: bool) -> Self {
        Self {
            name: action.name.clone(),
            description: action.description.clone(),
            priority: action.priority,
            success: false,
            output: String::new(),
            error: None,
            dry_run,
            execution_time_secs: 0.0,
            skipped: false,
            user_declined: false,
        }
    }

    pub fn outcome(&self) -> FixOutcome {
        if self.skipped {
            FixOutcome::Skipped
        } else if self.user_declined {
            FixOutcome::Declined
        } else if self.success {
            FixOutcome::Succeeded
        } else {
            FixOutcome::Failed
        }
    }

    /// Commands actually ran and succeeded
    pub fn applied(&self) -> bool {
        self.success && !self.skipped && !self.dry_run
    }
}

/// Everything recorded during one pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixSession {
    pub timestamp: String,
    pub dry_run: bool,
    pub auto_approve_destructive: bool,
    pub attempted: Vec<FixResult>,
    /// Includes skipped actions
    pub successful: Vec<String>,
    /// Includes declined actions
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
    pub declined: Vec<String>,
    pub requires_admin: bool,
    pub recommendations: Vec<String>,
}

impl FixSession {
    pub fn new(dry_run: bool, auto_approve_destructive: bool) -> Self {
        Self {
            timestamp: crate::timestamp(),
            dry_run,
            auto_approve_destructive,
            attempted: Vec::new(),
            successful: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            declined: Vec::new(),
            requires_admin: false,
            recommendations: Vec::new(),
        }
    }

    pub fn record(&mut self, result: FixResult, requires_admin: bool) {
        if result.success {
            self.successful.push(result.name.clone());
        } else {
            self.failed.push(result.name.clone());
        }
        if result.skipped {
            self.skipped.push(result.name.clone());
        }
        if result.user_declined {
            self.declined.push(result.name.clone());
        }
        self.requires_admin |= requires_admin;
        self.attempted.push(result);
    }

    /// Number of actions whose commands ran and succeeded
    pub fn applied_count(&self) -> usize {
        self.attempted.iter().filter(|r| r.applied()).count()
    }
}

/// Executor settings
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub dry_run: bool,
    pub auto_approve_destructive: bool,
    pub platform: PlatformId,
    pub command_timeout: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            auto_approve_destructive: false,
            platform: PlatformId::current(),
            command_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Progress hooks called during a pass
pub trait PassObserver {
    fn pass_started(&mut self, _total_actions: usize, _dry_run: bool) {}
    fn action_started(&mut self, _action: &RemediationAction, _dry_run: bool) {}
    fn action_finished(&mut self, _result: &FixResult) {}
    fn pass_finished(&mut self, _session: &FixSession) {}
}

struct NoopObserver;

impl PassObserver for NoopObserver {}

enum Completed {
    Output(String),
    Skipped,
}

#[derive(Debug, Error)]
enum ActionFailure {
    #[error("No commands defined for {0}")]
    NoCommands(PlatformId),

    #[error("User declined to execute this fix")]
    Declined,

    #[error("Command failed: {stderr}")]
    CommandFailed { stderr: String },

    #[error("{0}")]
    Exec(#[from] ExecError),
}

/// Runs remediation actions through a command runner, asking a confirmer
/// before destructive ones
pub struct RemediationExecutor<R, C> {
    runner: R,
    confirmer: C,
    options: ExecutorOptions,
    observer: Box<dyn PassObserver>,
}

impl<R: CommandRunner, C: Confirmer> RemediationExecutor<R, C> {
    pub fn new(runner: R, confirmer: C, options: ExecutorOptions) -> Self {
        Self {
            runner,
            confirmer,
            options,
            observer: Box::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: impl PassObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn confirmer(&self) -> &C {
        &self.confirmer
    }

    /// Attempt every action of every group, in group order and by priority
    /// within a group
    pub async fn run_pass(&mut self, groups: &[ActionGroup]) -> FixSession {
        let dry_run = self.options.dry_run;
        let mut session = FixSession::new(dry_run, self.options.auto_approve_destructive);
        let total: usize = groups.iter().map(|g| g.actions.len()).sum();

        info!("Attempting {} remediation action(s) (dry_run={})", total, dry_run);
        self.observer.pass_started(total, dry_run);

        for group in groups {
            info!("Attempting {} fixes...", group.trigger);
            for action in group.sorted_actions() {
                self.observer.action_started(action, dry_run);
                let result = self.attempt_action(action).await;
                self.observer.action_finished(&result);
                session.record(result, action.requires_admin);
            }
        }

        info!(
            "Pass complete: {}/{} successful",
            session.successful.len(),
            session.attempted.len()
        );
        self.observer.pass_finished(&session);
        session
    }

    /// Attempt a single action and record its outcome
    pub async fn attempt_action(&mut self, action: &RemediationAction) -> FixResult {
        let start = Instant::now();
        let mut result = FixResult::pending(action, self.options.dry_run);

        match self.execute(action).await {
            Ok(Completed::Output(output)) => {
                info!("Fix {} succeeded", action.name);
                result.success = true;
                result.output = output;
            }
            Ok(Completed::Skipped) => {
                info!("Fix {} skipped by user", action.name);
                result.success = true;
                result.skipped = true;
                result.output = SKIPPED_OUTPUT.to_string();
            }
            Err(failure) => {
                warn!("Fix {} not applied: {}", action.name, failure);
                result.user_declined = matches!(failure, ActionFailure::Declined);
                result.error = Some(failure.to_string());
            }
        }

        result.execution_time_secs = round_secs(start.elapsed());
        result
    }

    async fn execute(&mut self, action: &RemediationAction) -> Result<Completed, ActionFailure> {
        let platform = self.options.platform;
        let commands = action
            .commands_for(platform)
            .ok_or(ActionFailure::NoCommands(platform))?;
        let destructive = action.destructive();

        if self.options.dry_run {
            let mut output = format!("DRY RUN: Would execute {} command(s)", commands.len());
            if let Some(op) = destructive {
                output.push_str(&format!(" [⚠️ {}]", op.impact));
            }
            return Ok(Completed::Output(output));
        }

        if let Some(operation) = destructive {
            if self.options.auto_approve_destructive {
                warn!("Auto-approving destructive operation {}", action.name);
            } else {
                let request = ConfirmRequest {
                    action_name: &action.name,
                    action_description: &action.description,
                    operation,
                };
                match self.confirmer.confirm(&request) {
                    Decision::Approve => {}
                    Decision::Skip => return Ok(Completed::Skipped),
                    Decision::Decline => return Err(ActionFailure::Declined),
                }
            }
        }

        let mut blocks = Vec::with_capacity(commands.len());
        for spec in commands {
            debug!("{}: running {}", action.name, spec);
            let output = self.runner.run(spec, self.options.command_timeout).await?;
            blocks.push(format!("Command: {}\nOutput: {}", spec, output.stdout));

            if !output.success() {
                if spec.is_best_effort() {
                    debug!("Ignoring exit {} from {}", output.exit_code, spec);
                } else {
                    return Err(ActionFailure::CommandFailed {
                        stderr: output.stderr,
                    });
                }
            }
        }

        Ok(Completed::Output(blocks.join("\n\n")))
    }
}

fn round_secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}
