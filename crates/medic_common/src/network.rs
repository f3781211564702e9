//! Network diagnostics - interfaces, DNS, ping, routes, local ports, latency
//!
//! Pings go through the `CommandRunner` so repair tests can script them.
//! DNS lookups and port probes use tokio sockets directly.

use crate::command_exec::{CommandRunner, CommandSpec};
use crate::config::NetworkConfig;
use crate::platform::PlatformId;
use crate::severity::Severity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use sysinfo::Networks;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Overall network state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkHealth {
    Healthy,
    MinorIssues,
    MajorIssues,
}

impl NetworkHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::MinorIssues => "minor_issues",
            Self::MajorIssues => "major_issues",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Healthy => Severity::Ok,
            Self::MinorIssues => Severity::Warning,
            Self::MajorIssues => Severity::Error,
        }
    }

    pub fn is_healthy(&self) -> bool {
        *self == Self::Healthy
    }
}

impl fmt::Display for NetworkHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    pub name: String,
    pub mac_address: String,
    pub received_bytes: u64,
    pub transmitted_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceReport {
    pub interfaces: Vec<InterfaceInfo>,
    pub count: usize,
    /// Set when interfaces could not be enumerated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsLookup {
    pub status: LookupStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsReport {
    pub successful_resolutions: u32,
    pub failed_resolutions: u32,
    pub details: BTreeMap<String, DnsLookup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PingStatus {
    Success,
    Failed,
    /// The ping command itself could not run
    Error,
}

/// Statistics parsed from ping output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PingStats {
    pub packets_sent: u32,
    pub packets_received: u32,
    pub packet_loss_percent: f64,
    pub avg_response_time_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingResult {
    pub status: PingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<PingStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityReport {
    pub successful_pings: u32,
    pub failed_pings: u32,
    pub details: BTreeMap<String, PingResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingInfo {
    /// Raw output keyed by the command that produced it
    pub tables: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortScan {
    pub host: String,
    pub open_ports: Vec<u16>,
    pub closed_ports: Vec<u16>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandwidthAssessment {
    Excellent,
    Good,
    Fair,
    Poor,
    #[default]
    Unknown,
}

impl BandwidthAssessment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BandwidthReport {
    pub ping_tests: BTreeMap<String, PingResult>,
    pub assessment: BandwidthAssessment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_ping_ms: Option<f64>,
}

/// Full result of `run_full_diagnostics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkReport {
    pub timestamp: String,
    pub network_interfaces: InterfaceReport,
    pub dns_resolution: DnsReport,
    pub connectivity_tests: ConnectivityReport,
    pub routing_info: RoutingInfo,
    pub port_scans: PortScan,
    pub bandwidth_test: BandwidthReport,
    pub overall_status: NetworkHealth,
}

impl NetworkReport {
    /// Stand-in report used when diagnostics are skipped: every repair
    /// group triggers and the network counts as badly broken
    pub fn assumed_broken() -> Self {
        Self {
            timestamp: crate::timestamp(),
            network_interfaces: InterfaceReport {
                error: Some("diagnostics skipped".to_string()),
                ..InterfaceReport::default()
            },
            dns_resolution: DnsReport {
                successful_resolutions: 1,
                failed_resolutions: 2,
                details: BTreeMap::new(),
            },
            connectivity_tests: ConnectivityReport {
                successful_pings: 1,
                failed_pings: 2,
                details: BTreeMap::new(),
            },
            routing_info: RoutingInfo::default(),
            port_scans: PortScan::default(),
            bandwidth_test: BandwidthReport {
                assessment: BandwidthAssessment::Poor,
                ..BandwidthReport::default()
            },
            overall_status: NetworkHealth::MajorIssues,
        }
    }
}

/// Classify an average round-trip time
pub fn assess_bandwidth(average_ms: f64) -> BandwidthAssessment {
    if average_ms < 50.0 {
        BandwidthAssessment::Excellent
    } else if average_ms < 100.0 {
        BandwidthAssessment::Good
    } else if average_ms < 200.0 {
        BandwidthAssessment::Fair
    } else {
        BandwidthAssessment::Poor
    }
}

/// Count the issue categories: DNS, ping, latency
pub fn assess_network_health(
    dns: &DnsReport,
    connectivity: &ConnectivityReport,
    bandwidth: &BandwidthReport,
) -> NetworkHealth {
    let issues = [
        dns.failed_resolutions > dns.successful_resolutions,
        connectivity.failed_pings > connectivity.successful_pings,
        bandwidth.assessment == BandwidthAssessment::Poor,
    ]
    .into_iter()
    .filter(|issue| *issue)
    .count();

    match issues {
        0 => NetworkHealth::Healthy,
        1 => NetworkHealth::MinorIssues,
        _ => NetworkHealth::MajorIssues,
    }
}

/// Parse Unix (`N packets transmitted, M received`, `min/avg/max = a/b/c`)
/// and Windows (`Sent = N, Received = M`, `Average = Xms`) ping summaries
pub fn parse_ping_output(output: &str) -> PingStats {
    let mut stats = PingStats::default();

    for line in output.lines() {
        let lower = line.trim().to_lowercase();

        if lower.contains("packets transmitted") {
            let mut parts = lower.split(',');
            if let Some(sent) = parts.next().and_then(leading_number) {
                stats.packets_sent = sent;
            }
            if let Some(received) = parts.next().and_then(leading_number) {
                stats.packets_received = received;
            }
        } else if lower.contains("sent =") {
            if let Some(sent) = value_after(&lower, "sent =") {
                stats.packets_sent = sent;
            }
            if let Some(received) = value_after(&lower, "received =") {
                stats.packets_received = received;
            }
        } else if lower.contains("min/avg/max") {
            stats.avg_response_time_ms = lower
                .split('=')
                .nth(1)
                .and_then(|values| values.trim().split('/').nth(1))
                .and_then(|avg| avg.trim().parse().ok());
        } else if let Some(idx) = lower.find("average =") {
            stats.avg_response_time_ms = lower[idx + "average =".len()..]
                .trim()
                .trim_end_matches("ms")
                .trim()
                .parse()
                .ok();
        }
    }

    if stats.packets_sent > 0 {
        let lost = stats.packets_sent.saturating_sub(stats.packets_received);
        stats.packet_loss_percent = f64::from(lost) / f64::from(stats.packets_sent) * 100.0;
    }

    stats
}

fn leading_number(text: &str) -> Option<u32> {
    text.split_whitespace().next()?.parse().ok()
}

fn value_after(text: &str, key: &str) -> Option<u32> {
    let rest = &text[text.find(key)? + key.len()..];
    let digits: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Source of network diagnoses for the repair loop
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn diagnose(&self) -> NetworkReport;
}

/// Runs the network diagnostic suite
pub struct NetworkDiagnostics<R> {
    runner: R,
    platform: PlatformId,
    config: NetworkConfig,
}

impl<R: CommandRunner> NetworkDiagnostics<R> {
    pub fn new(runner: R, config: NetworkConfig) -> Self {
        Self::with_platform(runner, config, PlatformId::current())
    }

    pub fn with_platform(runner: R, config: NetworkConfig, platform: PlatformId) -> Self {
        Self {
            runner,
            platform,
            config,
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Run every diagnostic and assess overall health
    pub async fn run_full_diagnostics(&self, hosts: &[String]) -> NetworkReport {
        info!("Starting network diagnostics");

        let network_interfaces = self.get_network_interfaces();
        let dns_resolution = self.test_dns_resolution().await;
        let connectivity_tests = self.test_connectivity(hosts).await;
        let routing_info = self.get_routing_info().await;
        let port_scans = self.scan_common_ports("localhost").await;
        let bandwidth_test = self.test_bandwidth().await;

        let overall_status =
            assess_network_health(&dns_resolution, &connectivity_tests, &bandwidth_test);
        info!("Network diagnostics complete: {}", overall_status);

        NetworkReport {
            timestamp: crate::timestamp(),
            network_interfaces,
            dns_resolution,
            connectivity_tests,
            routing_info,
            port_scans,
            bandwidth_test,
            overall_status,
        }
    }

    pub fn get_network_interfaces(&self) -> InterfaceReport {
        let networks = Networks::new_with_refreshed_list();
        let mut interfaces: Vec<InterfaceInfo> = networks
            .iter()
            .map(|(name, data)| InterfaceInfo {
                name: name.clone(),
                mac_address: data.mac_address().to_string(),
                received_bytes: data.total_received(),
                transmitted_bytes: data.total_transmitted(),
            })
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));

        let count = interfaces.len();
        let error = (count == 0).then(|| "No network interfaces found".to_string());
        if let Some(e) = &error {
            warn!("{}", e);
        }

        InterfaceReport {
            interfaces,
            count,
            error,
        }
    }

    pub async fn test_dns_resolution(&self) -> DnsReport {
        let mut report = DnsReport::default();
        let timeout = Duration::from_secs(self.config.dns_timeout_secs);

        for domain in &self.config.dns_test_domains {
            let lookup = resolve(domain, timeout).await;
            match lookup.status {
                LookupStatus::Success => report.successful_resolutions += 1,
                LookupStatus::Failed => report.failed_resolutions += 1,
            }
            report.details.insert(domain.clone(), lookup);
        }

        debug!(
            "DNS: {}/{} resolved",
            report.successful_resolutions,
            report.successful_resolutions + report.failed_resolutions
        );
        report
    }

    pub async fn test_connectivity(&self, hosts: &[String]) -> ConnectivityReport {
        let mut report = ConnectivityReport::default();

        for host in hosts {
            let result = self.ping_host(host, self.config.ping_count).await;
            if result.status == PingStatus::Success {
                report.successful_pings += 1;
            } else {
                report.failed_pings += 1;
            }
            report.details.insert(host.clone(), result);
        }

        report
    }

    pub async fn ping_host(&self, host: &str, count: u32) -> PingResult {
        let count_flag = if self.platform.is_windows() { "-n" } else { "-c" };
        let count = count.to_string();
        let spec = CommandSpec::new(["ping", count_flag, count.as_str(), host]);

        match self.runner.run(&spec, self.config.ping_timeout()).await {
            Ok(output) if output.success() => PingResult {
                status: PingStatus::Success,
                statistics: Some(parse_ping_output(&output.stdout)),
                error: None,
                raw_output: Some(output.stdout),
            },
            Ok(output) => PingResult {
                status: PingStatus::Failed,
                statistics: None,
                error: Some(output.stderr),
                raw_output: Some(output.stdout),
            },
            Err(e) => {
                warn!("Ping to {} failed to run: {}", host, e);
                PingResult {
                    status: PingStatus::Error,
                    statistics: None,
                    error: Some(e.to_string()),
                    raw_output: None,
                }
            }
        }
    }

    pub async fn get_routing_info(&self) -> RoutingInfo {
        let specs: Vec<CommandSpec> = match self.platform {
            PlatformId::Windows => vec![CommandSpec::new(["route", "print"])],
            PlatformId::Linux => vec![CommandSpec::new(["ip", "route"])],
            _ => vec![CommandSpec::new(["netstat", "-rn"])],
        };

        let mut info = RoutingInfo::default();
        for spec in specs {
            match self.runner.run(&spec, self.config.ping_timeout()).await {
                Ok(output) => {
                    info.tables.insert(spec.to_string(), output.stdout);
                }
                Err(e) => info.error = Some(e.to_string()),
            }
        }
        info
    }

    /// TCP connect to each configured port on `host`
    pub async fn scan_common_ports(&self, host: &str) -> PortScan {
        let timeout = Duration::from_secs(self.config.port_scan_timeout_secs);
        let mut scan = PortScan {
            host: host.to_string(),
            ..PortScan::default()
        };

        for &port in &self.config.scan_ports {
            let open = matches!(
                tokio::time::timeout(timeout, TcpStream::connect((host, port))).await,
                Ok(Ok(_))
            );
            if open {
                scan.open_ports.push(port);
            } else {
                scan.closed_ports.push(port);
            }
        }
        scan
    }

    /// Latency-based assessment from ping averages
    pub async fn test_bandwidth(&self) -> BandwidthReport {
        let mut report = BandwidthReport::default();
        let mut averages = Vec::new();

        for host in &self.config.bandwidth_hosts {
            let result = self.ping_host(host, self.config.bandwidth_ping_count).await;
            if let Some(avg) = result
                .statistics
                .as_ref()
                .and_then(|stats| stats.avg_response_time_ms)
            {
                averages.push(avg);
            }
            report.ping_tests.insert(host.clone(), result);
        }

        if !averages.is_empty() {
            let overall = averages.iter().sum::<f64>() / averages.len() as f64;
            report.assessment = assess_bandwidth(overall);
            report.average_ping_ms = Some((overall * 100.0).round() / 100.0);
        }
        report
    }
}

#[async_trait]
impl<R: CommandRunner> NetworkProbe for NetworkDiagnostics<R> {
    async fn diagnose(&self) -> NetworkReport {
        self.run_full_diagnostics(&self.config.target_hosts).await
    }
}

async fn resolve(domain: &str, timeout: Duration) -> DnsLookup {
    let start = Instant::now();
    let result = tokio::time::timeout(timeout, tokio::net::lookup_host((domain, 0))).await;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let failed = |error: String| DnsLookup {
        status: LookupStatus::Failed,
        ip_address: None,
        response_time_ms: None,
        error: Some(error),
    };

    match result {
        Ok(Ok(addrs)) => {
            let addrs: Vec<IpAddr> = addrs.map(|a| a.ip()).collect();
            match addrs.iter().find(|ip| ip.is_ipv4()).or(addrs.first()) {
                Some(ip) => DnsLookup {
                    status: LookupStatus::Success,
                    ip_address: Some(ip.to_string()),
                    response_time_ms: Some((elapsed_ms * 100.0).round() / 100.0),
                    error: None,
                },
                None => failed("No addresses returned".to_string()),
            }
        }
        Ok(Err(e)) => failed(e.to_string()),
        Err(_) => failed(format!("Lookup timed out after {}s", timeout.as_secs())),
    }
}
