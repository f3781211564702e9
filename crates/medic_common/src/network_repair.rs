//! Network repair - choose remediation groups from a diagnosis and run them
//!
//! `repair_until_healthy` is the outer loop: diagnose, run a pass, wait for
//! the network to settle, diagnose again, until healthy or out of passes.

use crate::command_exec::CommandRunner;
use crate::config::RepairConfig;
use crate::confirmation::Confirmer;
use crate::network::{BandwidthAssessment, NetworkHealth, NetworkProbe, NetworkReport};
use crate::platform::PlatformId;
use crate::remediation::{catalog, ActionGroup, FixSession, RemediationExecutor};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const HEALTHY_RECOMMENDATION: &str = "Network appears healthy - no fixes needed";
pub const NO_FIXES_RECOMMENDATION: &str = "No automated fixes available for detected issues";

/// Groups a diagnosis triggers, in the order they run
pub type RepairPlan = Vec<ActionGroup>;

/// Groups triggered by a diagnosis on `platform`
pub fn triggered_groups(report: &NetworkReport, platform: PlatformId) -> RepairPlan {
    let mut groups = Vec::new();
    if report.dns_resolution.failed_resolutions > 0 {
        groups.push(catalog::dns_fixes());
    }
    if report.connectivity_tests.failed_pings > 0 {
        groups.push(catalog::connectivity_fixes());
    }
    if report.network_interfaces.error.is_some() {
        groups.push(catalog::interface_fixes());
    }
    if platform.is_windows() {
        groups.push(catalog::windows_fixes());
    }
    groups
}

/// Hints for issues automated fixes may not cover
pub fn manual_recommendations(report: &NetworkReport, platform: PlatformId) -> Vec<String> {
    let mut recommendations = Vec::new();

    if report.dns_resolution.failed_resolutions > 2 {
        recommendations.push(
            "Consider checking router DNS settings or contacting ISP if DNS issues persist"
                .to_string(),
        );
    }

    // no pings at all is not a cable problem
    let conn = &report.connectivity_tests;
    if conn.failed_pings > 0 && conn.failed_pings >= conn.successful_pings {
        recommendations.push(
            "Check physical network cables and router connectivity if ping failures persist"
                .to_string(),
        );
    }

    if platform.is_windows() {
        recommendations
            .push("Consider temporarily disabling Windows Firewall to test connectivity".to_string());
    }

    if report.bandwidth_test.assessment == BandwidthAssessment::Poor {
        recommendations.extend([
            "Consider running bandwidth tests at different times to rule out network congestion"
                .to_string(),
            "Check for background applications consuming bandwidth".to_string(),
            "Contact ISP if consistent poor performance occurs".to_string(),
        ]);
    }

    recommendations
}

/// Before/after comparison of a repair session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairSummary {
    pub initial_status: NetworkHealth,
    pub final_status: NetworkHealth,
    pub improvement: bool,
    pub total_fixes_attempted: usize,
    pub total_fixes_successful: usize,
    pub issues_resolved: Vec<String>,
    pub issues_remaining: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Everything `repair_until_healthy` did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairOutcome {
    pub initial_report: NetworkReport,
    /// Latest diagnosis after a pass that applied fixes
    pub final_report: Option<NetworkReport>,
    pub sessions: Vec<FixSession>,
    pub summary: RepairSummary,
}

impl RepairOutcome {
    fn new(
        initial_report: NetworkReport,
        final_report: Option<NetworkReport>,
        sessions: Vec<FixSession>,
    ) -> Self {
        let summary = summarize(&initial_report, final_report.as_ref(), &sessions);
        Self {
            initial_report,
            final_report,
            sessions,
            summary,
        }
    }

    pub fn final_status(&self) -> NetworkHealth {
        self.summary.final_status
    }
}

fn health_score(health: NetworkHealth) -> u8 {
    match health {
        NetworkHealth::MajorIssues => 1,
        NetworkHealth::MinorIssues => 2,
        NetworkHealth::Healthy => 3,
    }
}

fn summarize(
    initial: &NetworkReport,
    latest: Option<&NetworkReport>,
    sessions: &[FixSession],
) -> RepairSummary {
    const DNS_ISSUE: &str = "DNS resolution issues";
    const PING_ISSUE: &str = "Network connectivity issues";

    let current = latest.unwrap_or(initial);
    let mut summary = RepairSummary {
        initial_status: initial.overall_status,
        final_status: current.overall_status,
        improvement: health_score(current.overall_status) > health_score(initial.overall_status),
        total_fixes_attempted: sessions.iter().map(|s| s.attempted.len()).sum(),
        total_fixes_successful: sessions.iter().map(|s| s.successful.len()).sum(),
        issues_resolved: Vec::new(),
        issues_remaining: Vec::new(),
        recommendations: Vec::new(),
    };

    let checks = [
        (
            DNS_ISSUE,
            initial.dns_resolution.failed_resolutions,
            current.dns_resolution.failed_resolutions,
        ),
        (
            PING_ISSUE,
            initial.connectivity_tests.failed_pings,
            current.connectivity_tests.failed_pings,
        ),
    ];
    for (issue, before, after) in checks {
        if after > 0 {
            summary.issues_remaining.push(issue.to_string());
        } else if before > 0 && latest.is_some() {
            summary.issues_resolved.push(issue.to_string());
        }
    }

    if !summary.final_status.is_healthy() {
        if sessions.last().is_some_and(|s| s.successful.is_empty()) {
            summary
                .recommendations
                .push("Consider manual network configuration review".to_string());
        }
        if !summary.issues_remaining.is_empty() {
            summary
                .recommendations
                .push("Check hardware connections and router configuration".to_string());
        }
        summary
            .recommendations
            .push("Contact network administrator or ISP if issues persist".to_string());
    }

    summary
}

/// Drives remediation passes from network diagnoses
pub struct NetworkRepair<R, C> {
    executor: RemediationExecutor<R, C>,
    config: RepairConfig,
}

impl<R: CommandRunner, C: Confirmer> NetworkRepair<R, C> {
    pub fn new(executor: RemediationExecutor<R, C>, config: RepairConfig) -> Self {
        Self { executor, config }
    }

    pub fn executor(&self) -> &RemediationExecutor<R, C> {
        &self.executor
    }

    fn platform(&self) -> PlatformId {
        self.executor.options().platform
    }

    pub fn plan(&self, report: &NetworkReport) -> RepairPlan {
        triggered_groups(report, self.platform())
    }

    /// One pass of fixes for the issues in `report`
    pub async fn run_automated_fixes(&mut self, report: &NetworkReport) -> FixSession {
        let options = self.executor.options();
        let mut empty = FixSession::new(options.dry_run, options.auto_approve_destructive);

        if report.overall_status.is_healthy() {
            empty.recommendations.push(HEALTHY_RECOMMENDATION.to_string());
            return empty;
        }

        let groups = self.plan(report);
        if groups.is_empty() {
            empty.recommendations.push(NO_FIXES_RECOMMENDATION.to_string());
            return empty;
        }

        info!(
            "Attempting automated fixes (dry_run={})",
            self.executor.options().dry_run
        );
        let mut session = self.executor.run_pass(&groups).await;
        session
            .recommendations
            .extend(manual_recommendations(report, self.platform()));
        session
    }

    /// Diagnose, then repair until healthy or `max_passes` is reached
    pub async fn repair_until_healthy<P>(&mut self, probe: &P) -> RepairOutcome
    where
        P: NetworkProbe + ?Sized,
    {
        let initial = probe.diagnose().await;
        self.repair_from(initial, probe).await
    }

    /// Repair loop starting from an existing diagnosis
    ///
    /// A further pass only follows a pass that applied a fix. Skipped
    /// destructive actions count as successful in the session but do not
    /// keep the loop going.
    pub async fn repair_from<P>(&mut self, initial: NetworkReport, probe: &P) -> RepairOutcome
    where
        P: NetworkProbe + ?Sized,
    {
        info!("Initial network status: {}", initial.overall_status);
        let mut sessions = Vec::new();
        let mut latest: Option<NetworkReport> = None;

        if initial.overall_status.is_healthy() {
            return RepairOutcome::new(initial, latest, sessions);
        }

        let max_passes = self.config.max_passes.max(1);
        for attempt in 1..=max_passes {
            info!("Fix attempt {}/{}", attempt, max_passes);
            let current = latest.as_ref().unwrap_or(&initial);
            let session = self.run_automated_fixes(current).await;

            let dry_run = session.dry_run;
            let applied = session.applied_count();
            sessions.push(session);

            if dry_run {
                break;
            }
            if applied == 0 {
                warn!("No fixes applied in attempt {}", attempt);
                break;
            }

            info!(
                "Applied {} fix(es), waiting {}s for network changes to settle",
                applied, self.config.settle_secs
            );
            tokio::time::sleep(self.config.settle()).await;

            let report = probe.diagnose().await;
            let healthy = report.overall_status.is_healthy();
            latest = Some(report);
            if healthy {
                info!("Network issues resolved");
                break;
            }
        }

        RepairOutcome::new(initial, latest, sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remediation::Trigger;

    fn triggers(groups: &[ActionGroup]) -> Vec<Trigger> {
        groups.iter().map(|g| g.trigger).collect()
    }

    #[test]
    fn test_triggered_groups_broken_network() {
        let report = NetworkReport::assumed_broken();
        assert_eq!(
            triggers(&triggered_groups(&report, PlatformId::Linux)),
            [Trigger::DnsFailures, Trigger::PingFailures, Trigger::InterfaceError]
        );
        assert_eq!(
            triggers(&triggered_groups(&report, PlatformId::Windows)).last(),
            Some(&Trigger::WindowsHost)
        );
    }

    #[test]
    fn test_triggered_groups_dns_only() {
        let mut report = NetworkReport::assumed_broken();
        report.connectivity_tests.failed_pings = 0;
        report.network_interfaces.error = None;
        assert_eq!(
            triggers(&triggered_groups(&report, PlatformId::Macos)),
            [Trigger::DnsFailures]
        );
    }

    #[test]
    fn test_manual_recommendations() {
        let report = NetworkReport::assumed_broken();
        let recs = manual_recommendations(&report, PlatformId::Linux);
        // 2 DNS failures is not above the threshold
        assert!(!recs.iter().any(|r| r.contains("router DNS")));
        assert!(recs.iter().any(|r| r.contains("physical network cables")));
        assert!(recs.iter().any(|r| r.contains("background applications")));
        assert_eq!(recs.len(), 4);

        let windows = manual_recommendations(&report, PlatformId::Windows);
        assert!(windows.iter().any(|r| r.contains("Windows Firewall")));
    }

    #[test]
    fn test_no_cable_hint_without_ping_results() {
        let mut report = NetworkReport::assumed_broken();
        report.connectivity_tests.successful_pings = 0;
        report.connectivity_tests.failed_pings = 0;
        let recs = manual_recommendations(&report, PlatformId::Linux);
        assert!(!recs.iter().any(|r| r.contains("physical network cables")));

        report.connectivity_tests.failed_pings = 1;
        report.connectivity_tests.successful_pings = 1;
        let recs = manual_recommendations(&report, PlatformId::Linux);
        assert!(recs.iter().any(|r| r.contains("physical network cables")));
    }

    #[test]
    fn test_summary_without_followup_diagnosis() {
        let initial = NetworkReport::assumed_broken();
        let session = FixSession::new(true, false);
        let summary = summarize(&initial, None, &[session]);

        assert_eq!(summary.final_status, NetworkHealth::MajorIssues);
        assert!(!summary.improvement);
        assert!(summary.issues_resolved.is_empty());
        assert_eq!(summary.issues_remaining.len(), 2);
        assert!(summary
            .recommendations
            .iter()
            .any(|r| r.contains("manual network configuration")));
    }

    #[test]
    fn test_summary_with_improvement() {
        let initial = NetworkReport::assumed_broken();
        let mut fixed = NetworkReport::assumed_broken();
        fixed.dns_resolution.failed_resolutions = 0;
        fixed.connectivity_tests.failed_pings = 0;
        fixed.overall_status = NetworkHealth::Healthy;

        let summary = summarize(&initial, Some(&fixed), &[]);
        assert!(summary.improvement);
        assert_eq!(
            summary.issues_resolved,
            ["DNS resolution issues", "Network connectivity issues"]
        );
        assert!(summary.recommendations.is_empty());
    }
}
