//! Outer diagnose/repair loop against a scripted probe

use async_trait::async_trait;
use medic_common::command_exec::{CommandOutput, CommandRunner, CommandSpec};
use medic_common::config::RepairConfig;
use medic_common::confirmation::PolicyConfirmer;
use medic_common::error::ExecError;
use medic_common::network::{NetworkHealth, NetworkProbe, NetworkReport};
use medic_common::network_repair::{NetworkRepair, HEALTHY_RECOMMENDATION};
use medic_common::platform::PlatformId;
use medic_common::remediation::{ExecutorOptions, RemediationExecutor};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Every command exits with the same code
struct StaticRunner {
    exit_code: i32,
    calls: AtomicUsize,
}

impl StaticRunner {
    fn exiting(exit_code: i32) -> Self {
        Self {
            exit_code,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CommandRunner for StaticRunner {
    async fn run(
        &self,
        _spec: &CommandSpec,
        _timeout: Duration,
    ) -> Result<CommandOutput, ExecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CommandOutput {
            exit_code: self.exit_code,
            stdout: String::new(),
            stderr: "nope".to_string(),
        })
    }
}

/// Returns queued reports, repeating the last one
struct ScriptedProbe {
    reports: Mutex<VecDeque<NetworkReport>>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    fn new(reports: Vec<NetworkReport>) -> Self {
        Self {
            reports: Mutex::new(reports.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkProbe for ScriptedProbe {
    async fn diagnose(&self) -> NetworkReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut reports = self.reports.lock().unwrap();
        if reports.len() > 1 {
            reports.pop_front().unwrap()
        } else {
            reports.front().cloned().unwrap()
        }
    }
}

fn healthy() -> NetworkReport {
    let mut report = NetworkReport::assumed_broken();
    report.dns_resolution.failed_resolutions = 0;
    report.connectivity_tests.failed_pings = 0;
    report.network_interfaces.error = None;
    report.overall_status = NetworkHealth::Healthy;
    report
}

fn dns_only() -> NetworkReport {
    let mut report = healthy();
    report.dns_resolution.failed_resolutions = 3;
    report.dns_resolution.successful_resolutions = 1;
    report.overall_status = NetworkHealth::MinorIssues;
    report
}

fn repair(
    runner: &StaticRunner,
    dry_run: bool,
    max_passes: u32,
) -> NetworkRepair<&StaticRunner, PolicyConfirmer> {
    repair_answering(runner, PolicyConfirmer::always_decline(), dry_run, max_passes)
}

fn repair_answering(
    runner: &StaticRunner,
    confirmer: PolicyConfirmer,
    dry_run: bool,
    max_passes: u32,
) -> NetworkRepair<&StaticRunner, PolicyConfirmer> {
    let options = ExecutorOptions {
        dry_run,
        auto_approve_destructive: false,
        platform: PlatformId::Linux,
        command_timeout: Duration::from_secs(1),
    };
    let executor = RemediationExecutor::new(runner, confirmer, options);
    NetworkRepair::new(
        executor,
        RepairConfig {
            command_timeout_secs: 1,
            max_passes,
            settle_secs: 0,
        },
    )
}

#[tokio::test]
async fn test_healthy_network_runs_no_pass() {
    let runner = StaticRunner::exiting(0);
    let probe = ScriptedProbe::new(vec![healthy()]);
    let outcome = repair(&runner, false, 3).repair_until_healthy(&probe).await;

    assert!(outcome.sessions.is_empty());
    assert_eq!(outcome.final_status(), NetworkHealth::Healthy);
    assert_eq!(probe.calls(), 1);
    assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_healthy_report_short_circuits_fixes() {
    let runner = StaticRunner::exiting(0);
    let session = repair(&runner, false, 1).run_automated_fixes(&healthy()).await;
    assert!(session.attempted.is_empty());
    assert_eq!(session.recommendations, [HEALTHY_RECOMMENDATION]);
}

#[tokio::test]
async fn test_dry_run_stops_after_one_pass() {
    let runner = StaticRunner::exiting(0);
    let probe = ScriptedProbe::new(vec![dns_only()]);
    let outcome = repair(&runner, true, 5).repair_until_healthy(&probe).await;

    assert_eq!(outcome.sessions.len(), 1);
    assert_eq!(outcome.sessions[0].attempted.len(), 3);
    assert!(outcome.final_report.is_none());
    assert_eq!(probe.calls(), 1);
    assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stops_when_healthy_after_pass() {
    let runner = StaticRunner::exiting(0);
    let probe = ScriptedProbe::new(vec![dns_only(), healthy()]);
    let outcome = repair(&runner, false, 5).repair_until_healthy(&probe).await;

    assert_eq!(outcome.sessions.len(), 1);
    assert_eq!(probe.calls(), 2);
    assert_eq!(outcome.final_status(), NetworkHealth::Healthy);
    assert!(outcome.summary.improvement);
    assert_eq!(outcome.summary.issues_resolved, ["DNS resolution issues"]);
}

#[tokio::test]
async fn test_respects_max_passes() {
    let runner = StaticRunner::exiting(0);
    let probe = ScriptedProbe::new(vec![dns_only()]);
    let outcome = repair(&runner, false, 3).repair_until_healthy(&probe).await;

    assert_eq!(outcome.sessions.len(), 3);
    // initial diagnosis plus one after each pass
    assert_eq!(probe.calls(), 4);
    assert_eq!(outcome.final_status(), NetworkHealth::MinorIssues);
    assert_eq!(outcome.summary.total_fixes_attempted, 9);
}

#[tokio::test]
async fn test_stops_when_nothing_applied() {
    let runner = StaticRunner::exiting(1);
    let probe = ScriptedProbe::new(vec![dns_only()]);
    let outcome = repair(&runner, false, 3).repair_until_healthy(&probe).await;

    assert_eq!(outcome.sessions.len(), 1);
    assert_eq!(outcome.sessions[0].failed.len(), 3);
    assert_eq!(probe.calls(), 1);
    assert!(outcome
        .summary
        .recommendations
        .iter()
        .any(|r| r.contains("manual network configuration")));
}

#[tokio::test]
async fn test_repair_from_existing_report() {
    let runner = StaticRunner::exiting(0);
    let probe = ScriptedProbe::new(vec![healthy()]);
    let outcome = repair(&runner, false, 2)
        .repair_from(NetworkReport::assumed_broken(), &probe)
        .await;

    // dns, connectivity and interface groups on Linux
    assert_eq!(outcome.sessions[0].attempted.len(), 7);
    // destructive actions declined by policy
    assert_eq!(
        outcome.sessions[0].declined,
        ["reset_network_adapter", "reset_tcp_ip_stack", "disable_enable_adapter"]
    );
    assert_eq!(probe.calls(), 1);
    assert_eq!(outcome.final_status(), NetworkHealth::Healthy);
}

#[tokio::test]
async fn test_skipped_fixes_do_not_start_another_pass() {
    let runner = StaticRunner::exiting(1);
    let probe = ScriptedProbe::new(vec![healthy()]);
    let outcome = repair_answering(&runner, PolicyConfirmer::always_skip(), false, 3)
        .repair_from(NetworkReport::assumed_broken(), &probe)
        .await;

    assert_eq!(outcome.sessions.len(), 1);
    let session = &outcome.sessions[0];
    assert_eq!(
        session.skipped,
        ["reset_network_adapter", "reset_tcp_ip_stack", "disable_enable_adapter"]
    );
    assert_eq!(session.successful, session.skipped);
    assert_eq!(session.applied_count(), 0);
    assert_eq!(probe.calls(), 0);
    assert!(outcome.final_report.is_none());
}
