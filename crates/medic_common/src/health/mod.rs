//! Health checks - disk, memory, uptime, load, services, ports, remote hosts
//!
//! Results form a JSON check tree. Every leaf carries a `status` severity so
//! the tree can be rolled up by the shared aggregator into `overall_status`.

pub mod probes;

use crate::command_exec::{CommandRunner, CommandSpec, DEFAULT_TIMEOUT_SECS};
use crate::config::HealthConfig;
use crate::platform::{OsInfo, PlatformId};
use crate::severity::{aggregate, Severity};
use probes::{
    disk_status, format_uptime, is_pseudo_filesystem, load_status, memory_status,
    parse_listening_ports, parse_target, percent, round2,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use sysinfo::{Disks, System};
use tokio::net::TcpStream;
use tracing::{info, warn};

/// Runs the health check suite
pub struct HealthChecker<R> {
    runner: R,
    os: OsInfo,
}

impl<R: CommandRunner> HealthChecker<R> {
    pub fn new(runner: R) -> Self {
        Self::with_os(runner, OsInfo::detect())
    }

    pub fn with_os(runner: R, os: OsInfo) -> Self {
        Self { runner, os }
    }

    fn command_timeout(&self) -> Duration {
        Duration::from_secs(DEFAULT_TIMEOUT_SECS)
    }

    /// Run every check and roll the results up into `overall_status`
    pub async fn run_all_checks(&self, config: &HealthConfig) -> Value {
        info!("Starting comprehensive health check");

        let mut results = Map::new();
        results.insert("timestamp".into(), json!(crate::timestamp()));
        results.insert("system_info".into(), self.get_system_info());
        results.insert(
            "disk_space".into(),
            self.check_disk_space(config.disk_warning_percent, config.disk_critical_percent),
        );
        results.insert(
            "memory_usage".into(),
            self.check_memory_usage(config.memory_warning_percent),
        );
        results.insert("uptime".into(), self.check_uptime());
        results.insert("load_average".into(), self.check_load_average(config).await);
        results.insert("services".into(), self.check_services(&config.services).await);
        results.insert("ports".into(), self.check_ports(&config.ports).await);
        results.insert(
            "network".into(),
            self.check_network_connectivity(&config.hosts, config.ssh_timeout())
                .await,
        );

        let mut tree = Value::Object(results);
        let overall = aggregate(&tree);
        tree["overall_status"] = json!(overall);

        info!("Health check completed. Overall status: {}", overall);
        tree
    }

    pub fn get_system_info(&self) -> Value {
        let uptime = System::uptime();
        json!({
            "os_type": self.os.os_type,
            "distro": self.os.distro,
            "version": self.os.version,
            "architecture": self.os.architecture,
            "hostname": System::host_name().unwrap_or_else(|| "unknown".to_string()),
            "boot_time": boot_time_rfc3339(System::boot_time()),
            "uptime_seconds": uptime,
            "uptime_human": format_uptime(uptime),
            "cpu_count": num_cpus::get(),
            "cpu_count_physical": num_cpus::get_physical(),
        })
    }

    /// Per mount point usage, pseudo filesystems skipped on Linux
    pub fn check_disk_space(&self, warning: f64, critical: f64) -> Value {
        let disks = Disks::new_with_refreshed_list();
        let mut results = Map::new();

        for disk in disks.list() {
            let fstype = disk.file_system().to_string_lossy().to_string();
            if self.os.os_type == PlatformId::Linux && is_pseudo_filesystem(&fstype) {
                continue;
            }

            let total = disk.total_space();
            let free = disk.available_space();
            let used = total.saturating_sub(free);
            let used_percent = percent(used, total);

            results.insert(
                disk.mount_point().display().to_string(),
                json!({
                    "device": disk.name().to_string_lossy(),
                    "fstype": fstype,
                    "total_bytes": total,
                    "used_bytes": used,
                    "free_bytes": free,
                    "used_percent": round2(used_percent),
                    "status": disk_status(used_percent, warning, critical),
                    "total_human": crate::format_bytes(total),
                    "used_human": crate::format_bytes(used),
                    "free_human": crate::format_bytes(free),
                }),
            );
        }

        Value::Object(results)
    }

    pub fn check_memory_usage(&self, warning: f64) -> Value {
        let mut sys = System::new();
        sys.refresh_memory();

        let total = sys.total_memory();
        let used = sys.used_memory();
        let used_percent = percent(used, total);
        let swap_total = sys.total_swap();
        let swap_used = sys.used_swap();

        json!({
            "total_bytes": total,
            "available_bytes": sys.available_memory(),
            "used_bytes": used,
            "free_bytes": sys.free_memory(),
            "used_percent": round2(used_percent),
            "status": memory_status(used_percent, warning),
            "total_human": crate::format_bytes(total),
            "available_human": crate::format_bytes(sys.available_memory()),
            "used_human": crate::format_bytes(used),
            "swap": {
                "total_bytes": swap_total,
                "used_bytes": swap_used,
                "free_bytes": sys.free_swap(),
                "used_percent": round2(percent(swap_used, swap_total)),
                "total_human": crate::format_bytes(swap_total),
                "used_human": crate::format_bytes(swap_used),
            }
        })
    }

    pub fn check_uptime(&self) -> Value {
        let uptime = System::uptime();
        json!({
            "boot_time": boot_time_rfc3339(System::boot_time()),
            "uptime_seconds": uptime,
            "uptime_human": format_uptime(uptime),
            "status": Severity::Ok,
        })
    }

    /// Load per CPU on Unix, CPU percent on Windows
    pub async fn check_load_average(&self, config: &HealthConfig) -> Value {
        if self.os.os_type == PlatformId::Windows {
            let mut sys = System::new();
            sys.refresh_cpu();
            tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
            sys.refresh_cpu();
            let cpu_percent = sys.global_cpu_info().cpu_usage();
            let status = if cpu_percent > config.cpu_warning_percent {
                Severity::Warning
            } else {
                Severity::Ok
            };
            return json!({
                "cpu_percent": round2(f64::from(cpu_percent)),
                "status": status,
                "note": "Windows - showing CPU percentage",
            });
        }

        let load = System::load_average();
        let cpu_count = num_cpus::get().max(1);
        let normalized = load.one / cpu_count as f64;

        json!({
            "load_1min": load.one,
            "load_5min": load.five,
            "load_15min": load.fifteen,
            "load_normalized": round2(normalized),
            "cpu_count": cpu_count,
            "status": load_status(
                normalized,
                config.load_warning_per_cpu,
                config.load_critical_per_cpu,
            ),
        })
    }

    /// Service leaves carry a severity `status` and a `state`
    /// (running / stopped / unknown)
    pub async fn check_services(&self, services: &[String]) -> Value {
        if services.is_empty() {
            return json!({"note": "No services specified for checking"});
        }

        let mut results = Map::new();
        for service in services {
            let entry = match self.service_state(service).await {
                Ok(state) => {
                    let status = if state == "running" {
                        Severity::Ok
                    } else {
                        Severity::Warning
                    };
                    json!({"state": state, "status": status})
                }
                Err(error) => json!({"error": error, "status": Severity::Error}),
            };
            results.insert(service.clone(), entry);
        }
        Value::Object(results)
    }

    async fn service_state(&self, service: &str) -> Result<&'static str, String> {
        let spec = match self.os.os_type {
            PlatformId::Linux => CommandSpec::new(["systemctl", "is-active", service]),
            PlatformId::Macos => {
                let target = format!("system/{}", service);
                CommandSpec::new(["launchctl", "print", target.as_str()])
            }
            _ => return Ok("unknown"),
        };

        let output = self
            .runner
            .run(&spec, self.command_timeout())
            .await
            .map_err(|e| e.to_string())?;

        let running = match self.os.os_type {
            PlatformId::Linux => output.stdout.trim() == "active",
            _ => output.success(),
        };
        Ok(if running { "running" } else { "stopped" })
    }

    pub async fn check_ports(&self, ports: &[u16]) -> Value {
        if ports.is_empty() {
            return json!({"note": "No ports specified for checking"});
        }

        let listening = self.listening_ports().await;
        let mut results = Map::new();
        for port in ports {
            let is_listening = listening.contains(port);
            let status = if is_listening {
                Severity::Ok
            } else {
                Severity::Warning
            };
            results.insert(
                port.to_string(),
                json!({"is_listening": is_listening, "status": status}),
            );
        }
        Value::Object(results)
    }

    async fn listening_ports(&self) -> BTreeSet<u16> {
        let spec = match self.os.os_type {
            PlatformId::Linux => CommandSpec::new(["ss", "-ltnH"]),
            _ => CommandSpec::new(["netstat", "-an"]),
        };

        match self.runner.run(&spec, self.command_timeout()).await {
            Ok(output) => parse_listening_ports(&output.stdout),
            Err(e) => {
                warn!("Failed to get listening ports: {}", e);
                BTreeSet::new()
            }
        }
    }

    /// TCP connect to each `host[:port]` target
    pub async fn check_network_connectivity(&self, hosts: &[String], timeout: Duration) -> Value {
        if hosts.is_empty() {
            return json!({"note": "No hosts specified for checking"});
        }

        let mut results = Map::new();
        for target in hosts {
            results.insert(target.clone(), probe_target(target, timeout).await);
        }
        Value::Object(results)
    }
}

async fn probe_target(target: &str, timeout: Duration) -> Value {
    let Some((host, port)) = parse_target(target) else {
        return json!({"error": "Invalid target", "status": Severity::Error});
    };

    let lookup = tokio::net::lookup_host((host.as_str(), port));
    let addr = match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(mut addrs)) => addrs.next(),
        _ => None,
    };
    let Some(addr) = addr else {
        return json!({"error": "DNS resolution failed", "status": Severity::Error});
    };

    let start = Instant::now();
    let reachable = matches!(
        tokio::time::timeout(timeout, TcpStream::connect(addr)).await,
        Ok(Ok(_))
    );
    let response_time_ms = round2(start.elapsed().as_secs_f64() * 1000.0);
    let status = if reachable {
        Severity::Ok
    } else {
        Severity::Warning
    };

    json!({
        "reachable": reachable,
        "response_time_ms": response_time_ms,
        "status": status,
    })
}

pub(crate) fn boot_time_rfc3339(boot_time: u64) -> String {
    i64::try_from(boot_time)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.with_timezone(&chrono::Local).to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_exec::CommandOutput;
    use crate::error::ExecError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers each program with a fixed stdout and exit code
    struct CannedRunner {
        stdout: String,
        exit_code: i32,
        seen: Mutex<Vec<String>>,
    }

    impl CannedRunner {
        fn new(stdout: &str, exit_code: i32) -> Self {
            Self {
                stdout: stdout.to_string(),
                exit_code,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommandRunner for CannedRunner {
        async fn run(
            &self,
            spec: &CommandSpec,
            _timeout: Duration,
        ) -> Result<CommandOutput, ExecError> {
            self.seen.lock().unwrap().push(spec.to_string());
            Ok(CommandOutput {
                exit_code: self.exit_code,
                stdout: self.stdout.clone(),
                stderr: String::new(),
            })
        }
    }

    fn os(os_type: PlatformId) -> OsInfo {
        OsInfo {
            os_type,
            distro: "debian".to_string(),
            version: "12".to_string(),
            architecture: "x86_64".to_string(),
        }
    }

    #[tokio::test]
    async fn test_services_on_linux() {
        let checker = HealthChecker::with_os(CannedRunner::new("active\n", 0), os(PlatformId::Linux));
        let tree = checker.check_services(&["sshd".to_string()]).await;

        assert_eq!(tree["sshd"]["state"], "running");
        assert_eq!(tree["sshd"]["status"], "ok");
        assert_eq!(
            checker.runner.seen.lock().unwrap().as_slice(),
            ["systemctl is-active sshd"]
        );
    }

    #[tokio::test]
    async fn test_stopped_service_is_warning() {
        let checker = HealthChecker::with_os(CannedRunner::new("inactive\n", 3), os(PlatformId::Linux));
        let tree = checker.check_services(&["nginx".to_string()]).await;
        assert_eq!(tree["nginx"]["state"], "stopped");
        assert_eq!(aggregate(&tree), Severity::Warning);
    }

    #[tokio::test]
    async fn test_macos_service_uses_launchctl_exit_code() {
        let checker = HealthChecker::with_os(CannedRunner::new("", 0), os(PlatformId::Macos));
        let tree = checker.check_services(&["com.openssh.sshd".to_string()]).await;
        assert_eq!(tree["com.openssh.sshd"]["state"], "running");
        assert_eq!(
            checker.runner.seen.lock().unwrap().as_slice(),
            ["launchctl print system/com.openssh.sshd"]
        );
    }

    #[tokio::test]
    async fn test_empty_lists_produce_notes() {
        let checker = HealthChecker::with_os(CannedRunner::new("", 0), os(PlatformId::Linux));
        assert!(checker.check_services(&[]).await["note"].is_string());
        assert!(checker.check_ports(&[]).await["note"].is_string());
        assert!(checker
            .check_network_connectivity(&[], Duration::from_secs(1))
            .await["note"]
            .is_string());
    }

    #[tokio::test]
    async fn test_ports_from_ss() {
        let ss = "LISTEN 0 128 0.0.0.0:22 0.0.0.0:*\n";
        let checker = HealthChecker::with_os(CannedRunner::new(ss, 0), os(PlatformId::Linux));
        let tree = checker.check_ports(&[22, 443]).await;

        assert_eq!(tree["22"]["is_listening"], true);
        assert_eq!(tree["22"]["status"], "ok");
        assert_eq!(tree["443"]["status"], "warning");
    }

    #[tokio::test]
    async fn test_connectivity_to_local_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = format!("127.0.0.1:{}", listener.local_addr().unwrap().port());

        let closed_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let closed = format!("127.0.0.1:{}", closed_listener.local_addr().unwrap().port());
        drop(closed_listener);

        let checker = HealthChecker::with_os(CannedRunner::new("", 0), os(PlatformId::Linux));
        let tree = checker
            .check_network_connectivity(&[open.clone(), closed.clone()], Duration::from_secs(2))
            .await;

        assert_eq!(tree[open.as_str()]["status"], "ok");
        assert_eq!(tree[open.as_str()]["reachable"], true);
        assert_eq!(tree[closed.as_str()]["status"], "warning");
    }

    #[tokio::test]
    async fn test_run_all_checks_has_overall_status() {
        let checker = HealthChecker::with_os(CannedRunner::new("active\n", 0), os(PlatformId::Linux));
        let tree = checker.run_all_checks(&HealthConfig::default()).await;

        for key in ["timestamp", "system_info", "disk_space", "memory_usage", "uptime", "load_average"] {
            assert!(tree.get(key).is_some(), "missing {}", key);
        }
        let overall: Severity = serde_json::from_value(tree["overall_status"].clone()).unwrap();
        assert_eq!(overall, aggregate(&tree));
    }
}
