//! Pure classifiers and output parsers used by the health checks

use crate::severity::Severity;
use std::collections::BTreeSet;

/// Filesystems that never count as disks
pub const PSEUDO_FILESYSTEMS: &[&str] = &["tmpfs", "devtmpfs", "sysfs", "proc", "squashfs"];

/// SSH is assumed when a health target has no port
pub const DEFAULT_TARGET_PORT: u16 = 22;

pub fn is_pseudo_filesystem(fstype: &str) -> bool {
    PSEUDO_FILESYSTEMS.contains(&fstype)
}

/// Disk usage: critical at or above `critical`, warning at or above `warning`
pub fn disk_status(used_percent: f64, warning: f64, critical: f64) -> Severity {
    if used_percent >= critical {
        Severity::Critical
    } else if used_percent >= warning {
        Severity::Warning
    } else {
        Severity::Ok
    }
}

pub fn memory_status(used_percent: f64, warning: f64) -> Severity {
    if used_percent >= warning {
        Severity::Warning
    } else {
        Severity::Ok
    }
}

/// Normalized 1-minute load: strictly above the thresholds
pub fn load_status(load_per_cpu: f64, warning: f64, critical: f64) -> Severity {
    if load_per_cpu > critical {
        Severity::Critical
    } else if load_per_cpu > warning {
        Severity::Warning
    } else {
        Severity::Ok
    }
}

pub fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// "3d 4h 5m"
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    format!("{}d {}h {}m", days, hours, minutes)
}

/// Split `host[:port]`, defaulting to port 22
pub fn parse_target(target: &str) -> Option<(String, u16)> {
    match target.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && !host.contains(':') => {
            Some((host.to_string(), port.parse().ok()?))
        }
        Some(_) => None,
        None if target.is_empty() => None,
        None => Some((target.to_string(), DEFAULT_TARGET_PORT)),
    }
}

/// TCP ports in LISTEN state from `ss -ltn` or `netstat -an` output
pub fn parse_listening_ports(output: &str) -> BTreeSet<u16> {
    output
        .lines()
        .filter(|line| line.to_uppercase().contains("LISTEN"))
        .filter_map(|line| {
            line.split_whitespace()
                .find(|token| token.contains(':') || is_dotted_address(token))
                .and_then(address_port)
        })
        .collect()
}

fn is_dotted_address(token: &str) -> bool {
    token.contains('.') && token.parse::<f64>().is_err()
}

fn address_port(address: &str) -> Option<u16> {
    let idx = address.rfind([':', '.'])?;
    address[idx + 1..].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_status_thresholds() {
        assert_eq!(disk_status(79.9, 80.0, 90.0), Severity::Ok);
        assert_eq!(disk_status(80.0, 80.0, 90.0), Severity::Warning);
        assert_eq!(disk_status(90.0, 80.0, 90.0), Severity::Critical);
    }

    #[test]
    fn test_load_status_thresholds() {
        assert_eq!(load_status(1.0, 1.0, 1.5), Severity::Ok);
        assert_eq!(load_status(1.2, 1.0, 1.5), Severity::Warning);
        assert_eq!(load_status(1.6, 1.0, 1.5), Severity::Critical);
    }

    #[test]
    fn test_memory_status() {
        assert_eq!(memory_status(80.0, 80.0), Severity::Warning);
        assert_eq!(memory_status(42.0, 80.0), Severity::Ok);
    }

    #[test]
    fn test_percent_and_rounding() {
        assert_eq!(percent(1, 0), 0.0);
        assert_eq!(round2(percent(1, 3)), 33.33);
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "0d 0h 0m");
        assert_eq!(format_uptime(3 * 86_400 + 4 * 3_600 + 5 * 60 + 59), "3d 4h 5m");
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("google.com:80"), Some(("google.com".to_string(), 80)));
        assert_eq!(parse_target("build-box"), Some(("build-box".to_string(), 22)));
        assert_eq!(parse_target("host:notaport"), None);
        assert_eq!(parse_target(""), None);
    }

    #[test]
    fn test_parse_ss_output() {
        let ss = "LISTEN 0      128          0.0.0.0:22        0.0.0.0:*
LISTEN 0      511             [::]:80           [::]:*
LISTEN 0      4096   127.0.0.53%lo:53        0.0.0.0:*
";
        let ports = parse_listening_ports(ss);
        assert_eq!(ports.into_iter().collect::<Vec<_>>(), [22, 53, 80]);
    }

    #[test]
    fn test_parse_netstat_output() {
        let linux = "tcp        0      0 0.0.0.0:5432            0.0.0.0:*               LISTEN
tcp        0      0 10.0.0.2:22             10.0.0.9:51514          ESTABLISHED
udp        0      0 0.0.0.0:68              0.0.0.0:*
";
        assert_eq!(parse_listening_ports(linux).into_iter().collect::<Vec<_>>(), [5432]);

        let macos = "tcp4       0      0  *.8080                 *.*                    LISTEN
tcp4       0      0  127.0.0.1.631          *.*                    LISTEN
";
        assert_eq!(parse_listening_ports(macos).into_iter().collect::<Vec<_>>(), [631, 8080]);

        let windows = "  TCP    0.0.0.0:135            0.0.0.0:0              LISTENING
  TCP    192.168.1.5:49710      52.1.1.1:443           ESTABLISHED
";
        assert_eq!(parse_listening_ports(windows).into_iter().collect::<Vec<_>>(), [135]);
    }

    #[test]
    fn test_pseudo_filesystems() {
        assert!(is_pseudo_filesystem("tmpfs"));
        assert!(!is_pseudo_filesystem("ext4"));
    }
}
