//! Performance analysis - resource snapshot, bottlenecks, resource hogs
//!
//! Sampling goes through sysinfo. Classification and advice are plain
//! functions over the sampled numbers so they can be tested without a host.

use crate::config::PerformanceConfig;
use crate::health::probes::{is_pseudo_filesystem, percent, round2};
use crate::platform::{OsInfo, PlatformId};
use crate::severity::{aggregate, Severity};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::time::{Duration, Instant};
use sysinfo::{Disks, Networks, System};
use tracing::{debug, info, warn};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// CPU is sampled this many times when looking for a bottleneck
pub const CPU_SAMPLES: usize = 3;

/// Bottleneck grade as reported to users
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BottleneckSeverity {
    #[default]
    Normal,
    Medium,
    High,
    Critical,
}

impl BottleneckSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Position on the shared severity scale
    pub fn severity(&self) -> Severity {
        match self {
            Self::Normal => Severity::Ok,
            Self::Medium => Severity::Warning,
            Self::High => Severity::Error,
            Self::Critical => Severity::Critical,
        }
    }
}

impl fmt::Display for BottleneckSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn cpu_bottleneck_severity(average_percent: f64) -> BottleneckSeverity {
    if average_percent > 90.0 {
        BottleneckSeverity::Critical
    } else if average_percent > 80.0 {
        BottleneckSeverity::High
    } else if average_percent > 70.0 {
        BottleneckSeverity::Medium
    } else {
        BottleneckSeverity::Normal
    }
}

/// Memory grade plus the issues that produced it. Heavy swap use lifts a
/// normal grade to medium.
pub fn memory_bottleneck_severity(
    memory_percent: f64,
    swap_percent: f64,
) -> (BottleneckSeverity, Vec<String>) {
    let mut issues = Vec::new();
    let mut severity = if memory_percent > 95.0 {
        issues.push("Virtual memory critically low".to_string());
        BottleneckSeverity::Critical
    } else if memory_percent > 85.0 {
        issues.push("Virtual memory usage high".to_string());
        BottleneckSeverity::High
    } else if memory_percent > 75.0 {
        issues.push("Virtual memory usage elevated".to_string());
        BottleneckSeverity::Medium
    } else {
        BottleneckSeverity::Normal
    };

    if swap_percent > 50.0 {
        severity = severity.max(BottleneckSeverity::Medium);
        issues.push(format!("Swap usage high ({:.1}%)", swap_percent));
    }

    (severity, issues)
}

pub fn disk_bottleneck_severity(used_percent: f64) -> BottleneckSeverity {
    if used_percent > 95.0 {
        BottleneckSeverity::Critical
    } else if used_percent > 90.0 {
        BottleneckSeverity::High
    } else if used_percent > 80.0 {
        BottleneckSeverity::Medium
    } else {
        BottleneckSeverity::Normal
    }
}

/// Throughput grade: near gigabit saturation is high, near 100 Mbps medium
pub fn network_bottleneck_severity(max_mbps: f64) -> BottleneckSeverity {
    if max_mbps > 800.0 {
        BottleneckSeverity::High
    } else if max_mbps > 80.0 {
        BottleneckSeverity::Medium
    } else {
        BottleneckSeverity::Normal
    }
}

/// Megabits per second for a byte delta observed over `elapsed`
pub fn mbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    bytes as f64 * 8.0 / MIB / secs
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    pub overall_usage_percent: f64,
    pub per_core_usage: Vec<f64>,
    pub physical_cores: usize,
    pub logical_cores: usize,
    pub frequency_mhz: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub total_gb: f64,
    pub available_gb: f64,
    pub used_gb: f64,
    pub used_percent: f64,
    pub swap_total_gb: f64,
    pub swap_used_gb: f64,
    pub swap_used_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionUsage {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
    pub total_gb: f64,
    pub free_gb: f64,
    pub used_percent: f64,
}

/// Totals across all interfaces since boot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkCounters {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub errors_in: u64,
    pub errors_out: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub timestamp: String,
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub partitions: Vec<PartitionUsage>,
    pub network: NetworkCounters,
    pub process_count: usize,
    /// Not available on Windows
    pub load_average: Option<LoadAverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuBottleneck {
    pub average_cpu_percent: f64,
    pub peak_cpu_percent: f64,
    pub status: Severity,
    pub severity: BottleneckSeverity,
    pub description: String,
}

impl CpuBottleneck {
    pub fn from_samples(samples: &[f64]) -> Self {
        let average = if samples.is_empty() {
            0.0
        } else {
            samples.iter().sum::<f64>() / samples.len() as f64
        };
        let peak = samples.iter().copied().fold(0.0, f64::max);
        let severity = cpu_bottleneck_severity(average);
        Self {
            average_cpu_percent: round1(average),
            peak_cpu_percent: round1(peak),
            status: severity.severity(),
            severity,
            description: format!("CPU usage averaging {:.1}%", average),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryBottleneck {
    pub memory_usage_percent: f64,
    pub swap_usage_percent: f64,
    pub available_gb: f64,
    pub status: Severity,
    pub severity: BottleneckSeverity,
    pub issues: Vec<String>,
}

impl MemoryBottleneck {
    pub fn from_metrics(memory: &MemoryMetrics) -> Self {
        let (severity, issues) =
            memory_bottleneck_severity(memory.used_percent, memory.swap_used_percent);
        Self {
            memory_usage_percent: memory.used_percent,
            swap_usage_percent: memory.swap_used_percent,
            available_gb: memory.available_gb,
            status: severity.severity(),
            severity,
            issues,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskBottleneck {
    pub max_disk_usage_percent: f64,
    pub status: Severity,
    pub severity: BottleneckSeverity,
    pub disk_issues: Vec<String>,
}

impl DiskBottleneck {
    /// Worst mount wins
    pub fn from_partitions(partitions: &[PartitionUsage]) -> Self {
        let mut severity = BottleneckSeverity::Normal;
        let mut max_usage: f64 = 0.0;
        let mut disk_issues = Vec::new();

        for partition in partitions {
            max_usage = max_usage.max(partition.used_percent);
            let grade = disk_bottleneck_severity(partition.used_percent);
            if grade != BottleneckSeverity::Normal {
                disk_issues.push(format!(
                    "{}: {:.1}% full ({})",
                    partition.mountpoint, partition.used_percent, grade
                ));
            }
            severity = severity.max(grade);
        }

        Self {
            max_disk_usage_percent: round1(max_usage),
            status: severity.severity(),
            severity,
            disk_issues,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkBottleneck {
    pub mbps_sent: f64,
    pub mbps_received: f64,
    pub errors_in: u64,
    pub errors_out: u64,
    pub status: Severity,
    pub severity: BottleneckSeverity,
}

impl NetworkBottleneck {
    pub fn from_counters(before: &NetworkCounters, after: &NetworkCounters, elapsed: Duration) -> Self {
        let sent = mbps(after.bytes_sent.saturating_sub(before.bytes_sent), elapsed);
        let received = mbps(
            after.bytes_received.saturating_sub(before.bytes_received),
            elapsed,
        );
        let severity = network_bottleneck_severity(sent.max(received));
        Self {
            mbps_sent: round2(sent),
            mbps_received: round2(received),
            errors_in: after.errors_in,
            errors_out: after.errors_out,
            status: severity.severity(),
            severity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckReport {
    pub cpu_bottleneck: CpuBottleneck,
    pub memory_bottleneck: MemoryBottleneck,
    pub disk_bottleneck: DiskBottleneck,
    pub network_bottleneck: NetworkBottleneck,
    pub overall_assessment: Severity,
}

impl BottleneckReport {
    /// Assemble the report and roll the four statuses up
    pub fn new(
        cpu_bottleneck: CpuBottleneck,
        memory_bottleneck: MemoryBottleneck,
        disk_bottleneck: DiskBottleneck,
        network_bottleneck: NetworkBottleneck,
    ) -> Self {
        let mut report = Self {
            cpu_bottleneck,
            memory_bottleneck,
            disk_bottleneck,
            network_bottleneck,
            overall_assessment: Severity::Ok,
        };
        report.overall_assessment = rollup(serde_json::to_value(&report));
        report
    }
}

/// Worst status in the serialized report, ok when it could not be serialized
fn rollup(tree: serde_json::Result<serde_json::Value>) -> Severity {
    match tree {
        Ok(tree) => aggregate(&tree),
        Err(e) => {
            warn!("Failed to serialize bottleneck report, assuming ok: {}", e);
            Severity::Ok
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessUsage {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceHogs {
    pub top_cpu_consumers: Vec<ProcessUsage>,
    pub top_memory_consumers: Vec<ProcessUsage>,
}

impl ResourceHogs {
    /// Top `limit` processes by CPU and by memory
    pub fn rank(processes: &[ProcessUsage], limit: usize) -> Self {
        let top_by = |key: fn(&ProcessUsage) -> f64| {
            let mut sorted = processes.to_vec();
            sorted.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
            sorted.truncate(limit);
            sorted
        };
        Self {
            top_cpu_consumers: top_by(|p| p.cpu_percent),
            top_memory_consumers: top_by(|p| p.memory_percent),
        }
    }
}

pub const GENERAL_RECOMMENDATIONS: &[&str] = &[
    "Regularly restart the system to clear memory and apply updates.",
    "Keep the system updated with the latest security patches.",
    "Use antivirus software to protect against malware that can impact performance.",
    "Consider SSD upgrade if using traditional hard drives for better performance.",
    "Monitor startup programs and disable unnecessary ones.",
];

/// Advice derived from a snapshot, followed by the general tips
pub fn generate_recommendations(snapshot: &PerformanceSnapshot) -> Vec<String> {
    let mut recommendations = Vec::new();

    if snapshot.cpu.overall_usage_percent > 80.0 {
        recommendations.push(
            "High CPU usage detected. Consider closing unnecessary applications or upgrading CPU."
                .to_string(),
        );
    }

    let memory = &snapshot.memory;
    if memory.used_percent > 80.0 {
        recommendations.push(format!(
            "High memory usage ({:.1}%). Consider adding more RAM or closing memory-intensive applications.",
            memory.used_percent
        ));
    }
    if memory.swap_used_percent > 25.0 {
        recommendations.push(
            "High swap usage indicates insufficient RAM. Consider upgrading memory.".to_string(),
        );
    }

    for partition in snapshot.partitions.iter().filter(|p| p.used_percent > 90.0) {
        recommendations.push(format!(
            "Disk {} is {:.1}% full. Consider freeing up space.",
            partition.mountpoint, partition.used_percent
        ));
    }

    if snapshot.process_count > 300 {
        recommendations.push(format!(
            "High process count ({}). Consider reviewing running applications and services.",
            snapshot.process_count
        ));
    }

    recommendations.extend(GENERAL_RECOMMENDATIONS.iter().map(|r| r.to_string()));
    recommendations
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSummary {
    pub hostname: String,
    pub os_type: PlatformId,
    pub distro: String,
    pub version: String,
    pub architecture: String,
}

/// Everything `medicctl analyze` reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub timestamp: String,
    pub system_info: SystemSummary,
    pub snapshot: PerformanceSnapshot,
    pub bottlenecks: BottleneckReport,
    pub resource_hogs: ResourceHogs,
    pub recommendations: Vec<String>,
}

/// Samples the local host
pub struct PerformanceAnalyzer {
    config: PerformanceConfig,
    os: OsInfo,
    system: System,
    networks: Networks,
}

impl PerformanceAnalyzer {
    pub fn new(config: PerformanceConfig) -> Self {
        Self::with_os(config, OsInfo::detect())
    }

    pub fn with_os(config: PerformanceConfig, os: OsInfo) -> Self {
        Self {
            config,
            os,
            system: System::new(),
            networks: Networks::new_with_refreshed_list(),
        }
    }

    /// Interval between the two readings of a rate
    fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.config.sample_secs).max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)
    }

    pub async fn run_analysis(&mut self) -> PerformanceReport {
        info!("Starting performance analysis");
        let snapshot = self.capture_snapshot().await;
        let bottlenecks = self.analyze_bottlenecks().await;
        let resource_hogs = self.identify_resource_hogs().await;
        let recommendations = generate_recommendations(&snapshot);

        info!(
            "Performance analysis completed. Overall assessment: {}",
            bottlenecks.overall_assessment
        );
        PerformanceReport {
            timestamp: crate::timestamp(),
            system_info: self.system_summary(),
            snapshot,
            bottlenecks,
            resource_hogs,
            recommendations,
        }
    }

    pub fn system_summary(&self) -> SystemSummary {
        SystemSummary {
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            os_type: self.os.os_type,
            distro: self.os.distro.clone(),
            version: self.os.version.clone(),
            architecture: self.os.architecture.clone(),
        }
    }

    pub async fn capture_snapshot(&mut self) -> PerformanceSnapshot {
        let cpu = self.sample_cpu().await;
        self.system.refresh_processes();

        PerformanceSnapshot {
            timestamp: crate::timestamp(),
            cpu,
            memory: self.memory_metrics(),
            partitions: self.partitions(),
            network: self.network_counters(),
            process_count: self.system.processes().len(),
            load_average: self.load_average(),
        }
    }

    pub async fn analyze_bottlenecks(&mut self) -> BottleneckReport {
        let mut samples = Vec::with_capacity(CPU_SAMPLES);
        for _ in 0..CPU_SAMPLES {
            samples.push(self.sample_cpu().await.overall_usage_percent);
        }
        let cpu = CpuBottleneck::from_samples(&samples);
        let memory = MemoryBottleneck::from_metrics(&self.memory_metrics());
        let disk = DiskBottleneck::from_partitions(&self.partitions());

        let before = self.network_counters();
        let started = Instant::now();
        tokio::time::sleep(self.sample_interval()).await;
        let after = self.network_counters();
        let network = NetworkBottleneck::from_counters(&before, &after, started.elapsed());

        debug!(
            "Bottlenecks: cpu={} memory={} disk={} network={}",
            cpu.severity, memory.severity, disk.severity, network.severity
        );
        BottleneckReport::new(cpu, memory, disk, network)
    }

    /// Per-process CPU needs two refreshes a sample interval apart
    pub async fn identify_resource_hogs(&mut self) -> ResourceHogs {
        self.system.refresh_memory();
        self.system.refresh_processes();
        tokio::time::sleep(self.sample_interval()).await;
        self.system.refresh_processes();

        let total_memory = self.system.total_memory();
        let processes: Vec<ProcessUsage> = self
            .system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessUsage {
                pid: pid.as_u32(),
                name: process.name().to_string(),
                cpu_percent: round1(f64::from(process.cpu_usage())),
                memory_percent: round1(percent(process.memory(), total_memory)),
                memory_mb: round1(process.memory() as f64 / MIB),
            })
            .collect();

        ResourceHogs::rank(&processes, self.config.top_processes)
    }

    async fn sample_cpu(&mut self) -> CpuMetrics {
        self.system.refresh_cpu();
        tokio::time::sleep(self.sample_interval()).await;
        self.system.refresh_cpu();

        let cpus = self.system.cpus();
        CpuMetrics {
            overall_usage_percent: round1(f64::from(self.system.global_cpu_info().cpu_usage())),
            per_core_usage: cpus
                .iter()
                .map(|cpu| round1(f64::from(cpu.cpu_usage())))
                .collect(),
            physical_cores: num_cpus::get_physical(),
            logical_cores: cpus.len(),
            frequency_mhz: cpus.first().map(|cpu| cpu.frequency()),
        }
    }

    fn memory_metrics(&mut self) -> MemoryMetrics {
        self.system.refresh_memory();
        let sys = &self.system;
        MemoryMetrics {
            total_gb: round2(sys.total_memory() as f64 / GIB),
            available_gb: round2(sys.available_memory() as f64 / GIB),
            used_gb: round2(sys.used_memory() as f64 / GIB),
            used_percent: round1(percent(sys.used_memory(), sys.total_memory())),
            swap_total_gb: round2(sys.total_swap() as f64 / GIB),
            swap_used_gb: round2(sys.used_swap() as f64 / GIB),
            swap_used_percent: round1(percent(sys.used_swap(), sys.total_swap())),
        }
    }

    fn partitions(&self) -> Vec<PartitionUsage> {
        Disks::new_with_refreshed_list()
            .list()
            .iter()
            .filter_map(|disk| {
                let fstype = disk.file_system().to_string_lossy().to_string();
                if self.os.os_type == PlatformId::Linux && is_pseudo_filesystem(&fstype) {
                    return None;
                }
                let total = disk.total_space();
                if total == 0 {
                    return None;
                }
                let free = disk.available_space();
                Some(PartitionUsage {
                    device: disk.name().to_string_lossy().to_string(),
                    mountpoint: disk.mount_point().display().to_string(),
                    fstype,
                    total_gb: round2(total as f64 / GIB),
                    free_gb: round2(free as f64 / GIB),
                    used_percent: round1(percent(total.saturating_sub(free), total)),
                })
            })
            .collect()
    }

    fn network_counters(&mut self) -> NetworkCounters {
        self.networks.refresh();
        self.networks
            .iter()
            .fold(NetworkCounters::default(), |mut totals, (_, data)| {
                totals.bytes_sent += data.total_transmitted();
                totals.bytes_received += data.total_received();
                totals.packets_sent += data.total_packets_transmitted();
                totals.packets_received += data.total_packets_received();
                totals.errors_in += data.total_errors_on_received();
                totals.errors_out += data.total_errors_on_transmitted();
                totals
            })
    }

    fn load_average(&self) -> Option<LoadAverage> {
        if self.os.os_type == PlatformId::Windows {
            return None;
        }
        let load = System::load_average();
        Some(LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        })
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
