//! Medic Configuration
//!
//! Config file: ~/.config/medic/config.toml or /etc/medic/config.toml.
//! Every section and field is optional; missing values take the defaults below.

use crate::error::{MedicError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Color display mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color when stdout is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

/// Thresholds and targets for `medicctl health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub disk_warning_percent: f64,
    pub disk_critical_percent: f64,
    pub memory_warning_percent: f64,
    /// 1-minute load per CPU above which load is a warning
    pub load_warning_per_cpu: f64,
    pub load_critical_per_cpu: f64,
    /// CPU percent threshold used where load average is unavailable
    pub cpu_warning_percent: f32,
    pub services: Vec<String>,
    pub ports: Vec<u16>,
    /// `host` or `host:port`, port 22 when omitted
    pub hosts: Vec<String>,
    pub ssh_timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            disk_warning_percent: 80.0,
            disk_critical_percent: 90.0,
            memory_warning_percent: 80.0,
            load_warning_per_cpu: 1.0,
            load_critical_per_cpu: 1.5,
            cpu_warning_percent: 80.0,
            services: Vec::new(),
            ports: Vec::new(),
            hosts: Vec::new(),
            ssh_timeout_secs: 5,
        }
    }
}

impl HealthConfig {
    pub fn ssh_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh_timeout_secs)
    }
}

/// Targets for `medicctl diagnose`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub target_hosts: Vec<String>,
    pub dns_test_domains: Vec<String>,
    pub bandwidth_hosts: Vec<String>,
    pub ping_count: u32,
    pub bandwidth_ping_count: u32,
    pub ping_timeout_secs: u64,
    pub dns_timeout_secs: u64,
    /// Ports probed on localhost
    pub scan_ports: Vec<u16>,
    pub port_scan_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            target_hosts: vec!["8.8.8.8".to_string(), "google.com".to_string()],
            dns_test_domains: ["google.com", "microsoft.com", "cloudflare.com", "github.com"]
                .into_iter()
                .map(String::from)
                .collect(),
            bandwidth_hosts: vec!["8.8.8.8".to_string(), "1.1.1.1".to_string()],
            ping_count: 4,
            bandwidth_ping_count: 10,
            ping_timeout_secs: 30,
            dns_timeout_secs: 5,
            scan_ports: vec![22, 23, 25, 53, 80, 110, 143, 443, 993, 995, 3389, 5432, 3306],
            port_scan_timeout_secs: 2,
        }
    }
}

impl NetworkConfig {
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }
}

/// Settings for `medicctl repair`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub command_timeout_secs: u64,
    /// Upper bound on diagnose-and-fix passes
    pub max_passes: u32,
    /// Wait between a pass and the next diagnosis
    pub settle_secs: u64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: crate::command_exec::DEFAULT_TIMEOUT_SECS,
            max_passes: 1,
            settle_secs: 10,
        }
    }
}

impl RepairConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

/// Settings for `medicctl analyze`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Seconds between the two CPU/network samples
    pub sample_secs: u64,
    pub top_processes: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            sample_secs: 1,
            top_processes: 10,
        }
    }
}

/// Settings for `medicctl info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub sample_secs: u64,
    pub top_processes: usize,
    /// Services listed in the report; the totals still count every unit
    pub service_limit: usize,
    pub log_lines: usize,
    pub command_timeout_secs: u64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            sample_secs: 1,
            top_processes: 10,
            service_limit: 30,
            log_lines: 20,
            command_timeout_secs: 15,
        }
    }
}

impl InventoryConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub color: ColorMode,
}

/// Main medic configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicConfig {
    pub health: HealthConfig,
    pub network: NetworkConfig,
    pub repair: RepairConfig,
    pub performance: PerformanceConfig,
    pub inventory: InventoryConfig,
    pub output: OutputConfig,
}

impl MedicConfig {
    /// User config path: $XDG_CONFIG_HOME/medic/config.toml or ~/.config/medic/config.toml
    pub fn user_config_path() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            if !dir.is_empty() {
                return Ok(PathBuf::from(dir).join("medic").join("config.toml"));
            }
        }

        let home = std::env::var("HOME").map_err(|_| MedicError::NoHomeDir)?;
        Ok(Path::new(&home)
            .join(".config")
            .join("medic")
            .join("config.toml"))
    }

    /// System config path: /etc/medic/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/medic/config.toml")
    }

    /// Load configuration
    ///
    /// Priority:
    /// 1. User config
    /// 2. System config
    /// 3. Defaults
    pub fn load() -> Result<Self> {
        if let Ok(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::load_from(&user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Self::load_from(&system_path);
        }

        Ok(Self::default())
    }

    /// Load from an explicit file, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| MedicError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| MedicError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = MedicConfig::default();
        assert_eq!(config.health.disk_warning_percent, 80.0);
        assert_eq!(config.health.disk_critical_percent, 90.0);
        assert_eq!(config.repair.command_timeout_secs, 30);
        assert_eq!(config.repair.max_passes, 1);
        assert_eq!(config.repair.settle_secs, 10);
        assert_eq!(config.network.ping_count, 4);
        assert_eq!(config.network.dns_test_domains.len(), 4);
        assert_eq!(config.inventory.log_lines, 20);
        assert_eq!(config.inventory.service_limit, 30);
        assert_eq!(config.output.color, ColorMode::Auto);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: MedicConfig = toml::from_str(
            r#"
            [repair]
            max_passes = 3

            [health]
            services = ["sshd", "nginx"]
            "#,
        )
        .unwrap();

        assert_eq!(config.repair.max_passes, 3);
        assert_eq!(config.repair.settle_secs, 10);
        assert_eq!(config.health.services, ["sshd", "nginx"]);
        assert_eq!(config.health.memory_warning_percent, 80.0);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = MedicConfig::default();
        config.health.ports = vec![22, 443];
        config.output.color = ColorMode::Never;
        config.save_to(&path).unwrap();

        let loaded = MedicConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_errors_are_config_errors() {
        let dir = TempDir::new().unwrap();

        let missing = MedicConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(missing.is_config_error());

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[repair]\nmax_passes = \"many\"\n").unwrap();
        let err = MedicConfig::load_from(&bad).unwrap_err();
        assert!(matches!(err, MedicError::ConfigParse { .. }));
    }

    #[test]
    fn test_toml_sections() {
        let toml = MedicConfig::default().to_toml().unwrap();
        assert!(toml.contains("[health]"));
        assert!(toml.contains("[repair]"));
        assert!(toml.contains("[inventory]"));
        assert!(toml.contains("color = \"auto\""));
    }
}
