//! Inventory - system information report for support tickets
//!
//! Host facts (OS, hardware, storage, interfaces, processes) are read through
//! sysinfo. Service state and recent log lines come from the command runner;
//! their output is handled by the plain parsers at the bottom of this file.
//! Installed software is not enumerated.

use crate::command_exec::{CommandRunner, CommandSpec};
use crate::config::InventoryConfig;
use crate::health::boot_time_rfc3339;
use crate::health::probes::{format_uptime, is_pseudo_filesystem, percent, round2};
use crate::performance::{LoadAverage, NetworkCounters, ProcessUsage, ResourceHogs};
use crate::platform::{OsInfo, PlatformId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::{Disks, Networks, System};
use tracing::{debug, info, warn};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Read when `journalctl` is unavailable, first readable file wins
pub const DEFAULT_LOG_FILES: &[&str] = &["/var/log/messages", "/var/log/syslog"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub hostname: String,
    pub os_type: PlatformId,
    pub distro: String,
    pub os_version: String,
    pub long_os_version: Option<String>,
    pub kernel_version: Option<String>,
    pub architecture: String,
    pub boot_time: String,
    pub uptime_seconds: u64,
    pub uptime_human: String,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub current_user: Option<String>,
    pub home_directory: Option<String>,
    /// Windows only
    pub user_domain: Option<String>,
}

impl UserInfo {
    /// Read from environment variables through `lookup`
    pub fn from_env<F>(platform: PlatformId, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());
        if platform.is_windows() {
            Self {
                current_user: var("USERNAME"),
                home_directory: var("USERPROFILE"),
                user_domain: var("USERDOMAIN"),
            }
        } else {
            Self {
                current_user: var("USER"),
                home_directory: var("HOME"),
                user_domain: None,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    pub brand: String,
    pub vendor_id: String,
    pub physical_cores: usize,
    pub logical_cores: usize,
    pub frequency_mhz: Option<u64>,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total_gb: f64,
    pub available_gb: f64,
    pub used_percent: f64,
    pub swap_total_gb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    /// DMI identity, Linux only
    pub system_vendor: Option<String>,
    pub product_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSummary {
    pub name: String,
    pub mac_address: String,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub interfaces: Vec<InterfaceSummary>,
    pub statistics: NetworkCounters,
}

impl NetworkSummary {
    /// Interfaces sorted by name, with totals across all of them
    pub fn from_interfaces(mut interfaces: Vec<InterfaceSummary>) -> Self {
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        let statistics = interfaces
            .iter()
            .fold(NetworkCounters::default(), |mut totals, iface| {
                totals.bytes_sent += iface.bytes_sent;
                totals.bytes_received += iface.bytes_received;
                totals.packets_sent += iface.packets_sent;
                totals.packets_received += iface.packets_received;
                totals
            });
        Self {
            interfaces,
            statistics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageDisk {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
    pub kind: String,
    pub removable: bool,
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub used_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub disks: Vec<StorageDisk>,
    pub total_capacity_gb: f64,
    pub total_used_gb: f64,
}

impl StorageInfo {
    pub fn from_disks(disks: Vec<StorageDisk>) -> Self {
        let total_capacity_gb = round2(disks.iter().map(|d| d.total_gb).sum());
        let total_used_gb = round2(disks.iter().map(|d| d.used_gb).sum());
        Self {
            disks,
            total_capacity_gb,
            total_used_gb,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub total_processes: usize,
    pub top_cpu_processes: Vec<ProcessUsage>,
    pub top_memory_processes: Vec<ProcessUsage>,
}

impl ProcessInfo {
    pub fn from_processes(processes: &[ProcessUsage], limit: usize) -> Self {
        let hogs = ResourceHogs::rank(processes, limit);
        Self {
            total_processes: processes.len(),
            top_cpu_processes: hogs.top_cpu_consumers,
            top_memory_processes: hogs.top_memory_consumers,
        }
    }
}

/// One service as reported by the platform's service manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    /// running, stopped, failed, exited, paused or pending
    pub state: String,
    pub running: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Command the list came from
    pub source: String,
    pub total: usize,
    pub running: usize,
    pub services: Vec<ServiceEntry>,
    pub error: Option<String>,
}

impl ServiceInfo {
    /// Counts cover every entry; only the first `limit` are kept
    pub fn from_entries(source: String, mut entries: Vec<ServiceEntry>, limit: usize) -> Self {
        let total = entries.len();
        let running = entries.iter().filter(|s| s.running).count();
        entries.truncate(limit);
        Self {
            source,
            total,
            running,
            services: entries,
            error: None,
        }
    }

    fn failed(source: String, error: impl ToString) -> Self {
        Self {
            source,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogInfo {
    pub source: String,
    pub lines: Vec<String>,
    pub error: Option<String>,
}

/// Bytes read and written by processes alive at sampling time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDiskIo {
    pub read_bytes: u64,
    pub written_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceInfo {
    pub cpu_usage_percent: f64,
    pub memory_usage_percent: f64,
    /// Not available on Windows
    pub load_average: Option<LoadAverage>,
    pub disk_io: ProcessDiskIo,
}

/// Everything `medicctl info` reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryReport {
    pub timestamp: String,
    pub basic_info: BasicInfo,
    pub hardware_info: HardwareInfo,
    pub network_info: NetworkSummary,
    pub storage_info: StorageInfo,
    pub process_info: ProcessInfo,
    pub service_info: ServiceInfo,
    pub log_info: LogInfo,
    pub performance_info: PerformanceInfo,
}

/// Collects the inventory of the local host
///
/// CPU figures come from the last call to `sample`, which `gather_all_info`
/// makes first.
pub struct InventoryGatherer<R> {
    runner: R,
    config: InventoryConfig,
    os: OsInfo,
    system: System,
    log_files: Vec<PathBuf>,
    fs_root: PathBuf,
}

impl<R: CommandRunner> InventoryGatherer<R> {
    pub fn new(runner: R, config: InventoryConfig) -> Self {
        Self::with_os(runner, config, OsInfo::detect())
    }

    pub fn with_os(runner: R, config: InventoryConfig, os: OsInfo) -> Self {
        Self {
            runner,
            config,
            os,
            system: System::new(),
            log_files: DEFAULT_LOG_FILES.iter().map(PathBuf::from).collect(),
            fs_root: PathBuf::from("/"),
        }
    }

    /// Files tried for recent logs when `journalctl` is unavailable
    pub fn with_log_files(mut self, files: Vec<PathBuf>) -> Self {
        self.log_files = files;
        self
    }

    /// Root that `/sys` DMI files are read under
    pub fn with_fs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.fs_root = root.into();
        self
    }

    fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.config.sample_secs).max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)
    }

    pub async fn gather_all_info(&mut self) -> InventoryReport {
        info!("Gathering system inventory");
        self.sample().await;

        let report = InventoryReport {
            timestamp: crate::timestamp(),
            basic_info: self.basic_info(),
            hardware_info: self.hardware_info(),
            network_info: self.network_summary(),
            storage_info: self.storage_info(),
            process_info: self.process_info(),
            service_info: self.service_info().await,
            log_info: self.recent_logs().await,
            performance_info: self.performance_info(),
        };

        info!(
            "Inventory gathered: {} processes, {} services, {} disks",
            report.process_info.total_processes,
            report.service_info.total,
            report.storage_info.disks.len()
        );
        report
    }

    /// CPU and per-process usage need two refreshes a sample interval apart
    pub async fn sample(&mut self) {
        self.system.refresh_memory();
        self.system.refresh_cpu();
        self.system.refresh_processes();
        tokio::time::sleep(self.sample_interval()).await;
        self.system.refresh_cpu();
        self.system.refresh_processes();
    }

    pub fn basic_info(&self) -> BasicInfo {
        let uptime = System::uptime();
        BasicInfo {
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            os_type: self.os.os_type,
            distro: self.os.distro.clone(),
            os_version: self.os.version.clone(),
            long_os_version: System::long_os_version(),
            kernel_version: System::kernel_version(),
            architecture: self.os.architecture.clone(),
            boot_time: boot_time_rfc3339(System::boot_time()),
            uptime_seconds: uptime,
            uptime_human: format_uptime(uptime),
            user: UserInfo::from_env(self.os.os_type, |name| std::env::var(name).ok()),
        }
    }

    pub fn hardware_info(&self) -> HardwareInfo {
        let sys = &self.system;
        let cpus = sys.cpus();
        let first = cpus.first();

        let (system_vendor, product_name) = match self.os.os_type {
            PlatformId::Linux => read_dmi_identity(&self.fs_root),
            _ => (None, None),
        };

        HardwareInfo {
            cpu: CpuInfo {
                brand: first.map(|c| c.brand().trim().to_string()).unwrap_or_default(),
                vendor_id: first.map(|c| c.vendor_id().to_string()).unwrap_or_default(),
                physical_cores: num_cpus::get_physical(),
                logical_cores: cpus.len(),
                frequency_mhz: first.map(|c| c.frequency()),
                usage_percent: round2(f64::from(sys.global_cpu_info().cpu_usage())),
            },
            memory: MemoryInfo {
                total_gb: round2(sys.total_memory() as f64 / GIB),
                available_gb: round2(sys.available_memory() as f64 / GIB),
                used_percent: round2(percent(sys.used_memory(), sys.total_memory())),
                swap_total_gb: round2(sys.total_swap() as f64 / GIB),
            },
            system_vendor,
            product_name,
        }
    }

    pub fn network_summary(&self) -> NetworkSummary {
        let networks = Networks::new_with_refreshed_list();
        let interfaces = networks
            .iter()
            .map(|(name, data)| InterfaceSummary {
                name: name.clone(),
                mac_address: data.mac_address().to_string(),
                bytes_sent: data.total_transmitted(),
                bytes_received: data.total_received(),
                packets_sent: data.total_packets_transmitted(),
                packets_received: data.total_packets_received(),
            })
            .collect();
        NetworkSummary::from_interfaces(interfaces)
    }

    /// Mounted filesystems, pseudo filesystems skipped on Linux
    pub fn storage_info(&self) -> StorageInfo {
        let disks = Disks::new_with_refreshed_list()
            .list()
            .iter()
            .filter_map(|disk| {
                let fstype = disk.file_system().to_string_lossy().to_string();
                if self.os.os_type == PlatformId::Linux && is_pseudo_filesystem(&fstype) {
                    return None;
                }
                let total = disk.total_space();
                let free = disk.available_space();
                let used = total.saturating_sub(free);
                Some(StorageDisk {
                    device: disk.name().to_string_lossy().to_string(),
                    mountpoint: disk.mount_point().display().to_string(),
                    fstype,
                    kind: format!("{:?}", disk.kind()),
                    removable: disk.is_removable(),
                    total_gb: round2(total as f64 / GIB),
                    used_gb: round2(used as f64 / GIB),
                    free_gb: round2(free as f64 / GIB),
                    used_percent: round2(percent(used, total)),
                })
            })
            .collect();
        StorageInfo::from_disks(disks)
    }

    pub fn process_info(&self) -> ProcessInfo {
        let total_memory = self.system.total_memory();
        let processes: Vec<ProcessUsage> = self
            .system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessUsage {
                pid: pid.as_u32(),
                name: process.name().to_string(),
                cpu_percent: round2(f64::from(process.cpu_usage())),
                memory_percent: round2(percent(process.memory(), total_memory)),
                memory_mb: round2(process.memory() as f64 / MIB),
            })
            .collect();
        ProcessInfo::from_processes(&processes, self.config.top_processes)
    }

    pub fn performance_info(&self) -> PerformanceInfo {
        let sys = &self.system;
        let disk_io = sys
            .processes()
            .values()
            .fold(ProcessDiskIo::default(), |mut io, process| {
                let usage = process.disk_usage();
                io.read_bytes += usage.total_read_bytes;
                io.written_bytes += usage.total_written_bytes;
                io
            });

        let load_average = if self.os.os_type.is_windows() {
            None
        } else {
            let load = System::load_average();
            Some(LoadAverage {
                one: load.one,
                five: load.five,
                fifteen: load.fifteen,
            })
        };

        PerformanceInfo {
            cpu_usage_percent: round2(f64::from(sys.global_cpu_info().cpu_usage())),
            memory_usage_percent: round2(percent(sys.used_memory(), sys.total_memory())),
            load_average,
            disk_io,
        }
    }

    /// Service list from systemd, launchd or the Windows service manager
    pub async fn service_info(&self) -> ServiceInfo {
        let Some(spec) = service_command(self.os.os_type) else {
            return ServiceInfo::failed(
                String::new(),
                format!("Service listing not supported on {}", self.os.os_type),
            );
        };
        let source = spec.to_string();

        let output = match self.runner.run(&spec, self.config.command_timeout()).await {
            Ok(output) if output.success() => output,
            Ok(output) => {
                warn!("{} exited with {}", spec, output.exit_code);
                return ServiceInfo::failed(source, output.stderr.trim());
            }
            Err(e) => {
                warn!("Failed to list services: {}", e);
                return ServiceInfo::failed(source, e);
            }
        };

        let entries = match self.os.os_type {
            PlatformId::Windows => match parse_windows_services(&output.stdout) {
                Ok(entries) => entries,
                Err(e) => return ServiceInfo::failed(source, format!("Invalid JSON: {}", e)),
            },
            PlatformId::Macos => parse_launchctl_list(&output.stdout),
            _ => parse_systemctl_units(&output.stdout),
        };
        debug!("Parsed {} services from {}", entries.len(), source);
        ServiceInfo::from_entries(source, entries, self.config.service_limit)
    }

    /// Last log lines from the journal, unified log or System event log
    pub async fn recent_logs(&self) -> LogInfo {
        let lines = self.config.log_lines;
        let spec = log_command(self.os.os_type, lines);
        let source = spec.to_string();

        let failure = match self.runner.run(&spec, self.config.command_timeout()).await {
            Ok(output) if output.success() => {
                return LogInfo {
                    source,
                    lines: tail_lines(&output.stdout, lines),
                    error: None,
                };
            }
            Ok(output) => format!("exit {}: {}", output.exit_code, output.stderr.trim()),
            Err(e) => e.to_string(),
        };
        warn!("Failed to read recent logs with {}: {}", source, failure);

        if self.os.os_type == PlatformId::Linux {
            if let Some(log) = self.tail_log_files(lines) {
                return log;
            }
        }
        LogInfo {
            source,
            lines: Vec::new(),
            error: Some(failure),
        }
    }

    fn tail_log_files(&self, lines: usize) -> Option<LogInfo> {
        self.log_files.iter().find_map(|path| match fs::read_to_string(path) {
            Ok(contents) => Some(LogInfo {
                source: path.display().to_string(),
                lines: tail_lines(&contents, lines),
                error: None,
            }),
            Err(e) => {
                debug!("Cannot read {}: {}", path.display(), e);
                None
            }
        })
    }
}

fn service_command(platform: PlatformId) -> Option<CommandSpec> {
    match platform {
        PlatformId::Linux => Some(CommandSpec::new([
            "systemctl",
            "list-units",
            "--type=service",
            "--no-pager",
            "--no-legend",
            "--plain",
        ])),
        PlatformId::Macos => Some(CommandSpec::new(["launchctl", "list"])),
        PlatformId::Windows => Some(CommandSpec::new([
            "powershell",
            "-NoProfile",
            "-Command",
            "Get-Service | Select-Object Name,DisplayName,Status | ConvertTo-Json",
        ])),
        PlatformId::Other => None,
    }
}

fn log_command(platform: PlatformId, lines: usize) -> CommandSpec {
    match platform {
        // `log show` has no line limit; its output is cut at the capture size
        PlatformId::Macos => CommandSpec::shell(format!(
            "log show --last 5m --style syslog | tail -n {}",
            lines
        )),
        PlatformId::Windows => CommandSpec::new([
            "powershell".to_string(),
            "-NoProfile".to_string(),
            "-Command".to_string(),
            format!(
                "Get-EventLog -LogName System -Newest {} | \
                 Format-Table TimeGenerated,EntryType,Source,Message -AutoSize | \
                 Out-String -Width 200",
                lines
            ),
        ]),
        _ => CommandSpec::new([
            "journalctl".to_string(),
            "-n".to_string(),
            lines.to_string(),
            "--no-pager".to_string(),
        ]),
    }
}

/// Vendor and product name from `sys/devices/virtual/dmi/id` under `root`
pub fn read_dmi_identity(root: &Path) -> (Option<String>, Option<String>) {
    let dmi = root.join("sys/devices/virtual/dmi/id");
    let read = |name: &str| {
        fs::read_to_string(dmi.join(name))
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    (read("sys_vendor"), read("product_name"))
}

/// `systemctl list-units --plain --no-legend` rows:
/// `UNIT LOAD ACTIVE SUB DESCRIPTION...`
pub fn parse_systemctl_units(output: &str) -> Vec<ServiceEntry> {
    output
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace().peekable();
            // failed units are marked even with --plain on some versions
            if tokens.peek().is_some_and(|t| *t == "●" || *t == "*") {
                tokens.next();
            }
            let name = tokens.next()?;
            let _load = tokens.next()?;
            let active = tokens.next()?;
            let sub = tokens.next()?;
            let description = tokens.collect::<Vec<_>>().join(" ");

            let state = if active == "failed" { "failed" } else { sub };
            Some(ServiceEntry {
                name: name.to_string(),
                state: state.to_string(),
                running: sub == "running",
                description: (!description.is_empty()).then_some(description),
            })
        })
        .collect()
}

/// `launchctl list` rows: `PID STATUS LABEL`, PID `-` when not running
pub fn parse_launchctl_list(output: &str) -> Vec<ServiceEntry> {
    output
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let pid = tokens.next()?;
            let status = tokens.next()?;
            let label = tokens.next()?;
            if pid == "PID" {
                return None;
            }

            let running = pid.parse::<u32>().is_ok();
            let state = if running {
                "running"
            } else if status != "0" {
                "failed"
            } else {
                "stopped"
            };
            Some(ServiceEntry {
                name: label.to_string(),
                state: state.to_string(),
                running,
                description: None,
            })
        })
        .collect()
}

/// `Get-Service | ConvertTo-Json` output. `Status` is the numeric
/// ServiceControllerStatus on Windows PowerShell and a name on PowerShell 7.
/// A single service comes back as an object rather than an array.
pub fn parse_windows_services(output: &str) -> serde_json::Result<Vec<ServiceEntry>> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(output)?;
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    Ok(items
        .iter()
        .filter_map(|item| {
            let name = item.get("Name")?.as_str()?.to_string();
            let state = match item.get("Status") {
                Some(Value::Number(code)) => windows_status_name(code.as_u64().unwrap_or(0)),
                Some(Value::String(status)) => status.to_lowercase(),
                _ => "unknown".to_string(),
            };
            Some(ServiceEntry {
                name,
                running: state == "running",
                state,
                description: item
                    .get("DisplayName")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        })
        .collect())
}

fn windows_status_name(code: u64) -> String {
    match code {
        1 => "stopped",
        4 => "running",
        7 => "paused",
        2 | 3 | 5 | 6 => "pending",
        _ => "unknown",
    }
    .to_string()
}

/// Last `limit` non-empty lines, journal markers (`-- ... --`) dropped
pub fn tail_lines(output: &str, limit: usize) -> Vec<String> {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty() && !line.starts_with("-- "))
        .collect();
    let start = lines.len().saturating_sub(limit);
    lines[start..].iter().map(|line| line.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn usage(pid: u32, cpu: f64, mem: f64) -> ProcessUsage {
        ProcessUsage {
            pid,
            name: format!("proc{}", pid),
            cpu_percent: cpu,
            memory_percent: mem,
            memory_mb: mem * 10.0,
        }
    }

    #[test]
    fn test_parse_systemctl_units() {
        let output = "\
cron.service                 loaded active running Regular background program processing daemon
● nginx.service              loaded failed failed  A high performance web server
systemd-fsck-root.service    loaded active exited  File System Check on Root Device

garbage
";
        let services = parse_systemctl_units(output);
        assert_eq!(services.len(), 3);

        assert_eq!(services[0].name, "cron.service");
        assert_eq!(services[0].state, "running");
        assert!(services[0].running);
        assert_eq!(
            services[0].description.as_deref(),
            Some("Regular background program processing daemon")
        );

        assert_eq!(services[1].name, "nginx.service");
        assert_eq!(services[1].state, "failed");
        assert!(!services[1].running);

        assert_eq!(services[2].state, "exited");
        assert!(!services[2].running);
    }

    #[test]
    fn test_parse_launchctl_list() {
        let output = "PID\tStatus\tLabel\n\
                      412\t0\tcom.apple.cfprefsd.xpc.daemon\n\
                      -\t0\tcom.apple.backupd-auto\n\
                      -\t78\tcom.example.crashy\n";
        let services = parse_launchctl_list(output);
        let states: Vec<(&str, &str)> = services
            .iter()
            .map(|s| (s.name.as_str(), s.state.as_str()))
            .collect();
        assert_eq!(
            states,
            [
                ("com.apple.cfprefsd.xpc.daemon", "running"),
                ("com.apple.backupd-auto", "stopped"),
                ("com.example.crashy", "failed"),
            ]
        );
        assert!(services[0].running);
    }

    #[test]
    fn test_parse_windows_services_numeric_and_named_status() {
        let output = r#"[
            {"Name": "Dhcp", "DisplayName": "DHCP Client", "Status": 4},
            {"Name": "Spooler", "DisplayName": "Print Spooler", "Status": 1},
            {"Name": "WSearch", "Status": "Running"}
        ]"#;
        let services = parse_windows_services(output).unwrap();
        assert_eq!(services.len(), 3);
        assert_eq!(services[0].state, "running");
        assert_eq!(services[0].description.as_deref(), Some("DHCP Client"));
        assert_eq!(services[1].state, "stopped");
        assert!(!services[1].running);
        assert!(services[2].running);
        assert_eq!(services[2].description, None);
    }

    #[test]
    fn test_parse_windows_single_service_and_bad_json() {
        let single = parse_windows_services(r#"{"Name": "Dhcp", "Status": 7}"#).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].state, "paused");

        assert!(parse_windows_services("").unwrap().is_empty());
        assert!(parse_windows_services("not json").is_err());
    }

    #[test]
    fn test_tail_lines() {
        let output = "-- Logs begin at Mon 2025-11-03 --\nline 1\n\nline 2\nline 3   \n";
        assert_eq!(tail_lines(output, 2), ["line 2", "line 3"]);
        assert_eq!(tail_lines(output, 10), ["line 1", "line 2", "line 3"]);
        assert!(tail_lines("-- No entries --\n", 5).is_empty());
        assert!(tail_lines(output, 0).is_empty());
    }

    #[test]
    fn test_service_info_counts_before_truncating() {
        let entry = |name: &str, running: bool| ServiceEntry {
            name: name.to_string(),
            state: if running { "running" } else { "stopped" }.to_string(),
            running,
            description: None,
        };
        let info = ServiceInfo::from_entries(
            "systemctl".to_string(),
            vec![entry("a", true), entry("b", false), entry("c", true)],
            2,
        );
        assert_eq!(info.total, 3);
        assert_eq!(info.running, 2);
        assert_eq!(info.services.len(), 2);
        assert!(info.error.is_none());
    }

    #[test]
    fn test_storage_totals() {
        let disk = |mount: &str, total: f64, used: f64| StorageDisk {
            device: "/dev/sda1".to_string(),
            mountpoint: mount.to_string(),
            fstype: "ext4".to_string(),
            kind: "SSD".to_string(),
            removable: false,
            total_gb: total,
            used_gb: used,
            free_gb: total - used,
            used_percent: round2(used / total * 100.0),
        };
        let storage = StorageInfo::from_disks(vec![disk("/", 100.5, 40.25), disk("/home", 200.0, 10.0)]);
        assert_eq!(storage.total_capacity_gb, 300.5);
        assert_eq!(storage.total_used_gb, 50.25);
        assert_eq!(StorageInfo::from_disks(Vec::new()).total_capacity_gb, 0.0);
    }

    #[test]
    fn test_network_summary_totals_and_order() {
        let iface = |name: &str, sent: u64| InterfaceSummary {
            name: name.to_string(),
            mac_address: "00:00:00:00:00:00".to_string(),
            bytes_sent: sent,
            bytes_received: sent * 2,
            packets_sent: 1,
            packets_received: 2,
        };
        let summary = NetworkSummary::from_interfaces(vec![iface("wlan0", 10), iface("eth0", 5)]);
        assert_eq!(summary.interfaces[0].name, "eth0");
        assert_eq!(summary.statistics.bytes_sent, 15);
        assert_eq!(summary.statistics.bytes_received, 30);
        assert_eq!(summary.statistics.packets_received, 4);
    }

    #[test]
    fn test_process_info_ranks_and_counts() {
        let processes = [usage(1, 5.0, 50.0), usage(2, 90.0, 1.0), usage(3, 40.0, 20.0)];
        let info = ProcessInfo::from_processes(&processes, 2);
        assert_eq!(info.total_processes, 3);
        let cpu: Vec<u32> = info.top_cpu_processes.iter().map(|p| p.pid).collect();
        let mem: Vec<u32> = info.top_memory_processes.iter().map(|p| p.pid).collect();
        assert_eq!(cpu, [2, 3]);
        assert_eq!(mem, [1, 3]);
    }

    #[test]
    fn test_user_info_per_platform() {
        let env = |name: &str| match name {
            "USER" => Some("alice".to_string()),
            "HOME" => Some("/home/alice".to_string()),
            "USERNAME" => Some("Alice".to_string()),
            "USERDOMAIN" => Some("CORP".to_string()),
            "USERPROFILE" => Some(String::new()),
            _ => None,
        };

        let unix = UserInfo::from_env(PlatformId::Linux, env);
        assert_eq!(unix.current_user.as_deref(), Some("alice"));
        assert_eq!(unix.home_directory.as_deref(), Some("/home/alice"));
        assert_eq!(unix.user_domain, None);

        let windows = UserInfo::from_env(PlatformId::Windows, env);
        assert_eq!(windows.current_user.as_deref(), Some("Alice"));
        assert_eq!(windows.user_domain.as_deref(), Some("CORP"));
        // empty values are treated as unset
        assert_eq!(windows.home_directory, None);
    }

    #[test]
    fn test_read_dmi_identity() {
        let dir = TempDir::new().unwrap();
        let dmi = dir.path().join("sys/devices/virtual/dmi/id");
        fs::create_dir_all(&dmi).unwrap();
        fs::write(dmi.join("sys_vendor"), "LENOVO\n").unwrap();
        fs::write(dmi.join("product_name"), "  \n").unwrap();

        let (vendor, product) = read_dmi_identity(dir.path());
        assert_eq!(vendor.as_deref(), Some("LENOVO"));
        assert_eq!(product, None);

        let empty = TempDir::new().unwrap();
        assert_eq!(read_dmi_identity(empty.path()), (None, None));
    }

    #[test]
    fn test_log_command_per_platform() {
        assert_eq!(
            log_command(PlatformId::Linux, 20).to_string(),
            "journalctl -n 20 --no-pager"
        );
        assert!(log_command(PlatformId::Macos, 5).shell);
        assert!(service_command(PlatformId::Other).is_none());
    }
}
