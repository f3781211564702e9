//! Platform - operating system identity and distro detection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Operating system family used to pick per-platform commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    Linux,
    Macos,
    Windows,
    Other,
}

impl PlatformId {
    /// Platform this binary was built for
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an `std::env::consts::OS` style name
    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" => Self::Linux,
            "macos" | "darwin" => Self::Macos,
            "windows" => Self::Windows,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
            Self::Other => "other",
        }
    }

    pub fn is_windows(&self) -> bool {
        *self == Self::Windows
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker files checked when /etc/os-release is missing or has no ID
const DISTRO_MARKERS: &[(&str, &str)] = &[
    ("/etc/debian_version", "debian"),
    ("/etc/arch-release", "arch"),
    ("/etc/fedora-release", "fedora"),
    ("/etc/redhat-release", "rhel"),
    ("/etc/SuSE-release", "opensuse"),
    ("/etc/alpine-release", "alpine"),
];

/// Basic description of the host OS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsInfo {
    pub os_type: PlatformId,
    /// Linux distribution id (e.g. "ubuntu"), "unknown" elsewhere
    pub distro: String,
    pub version: String,
    pub architecture: String,
}

impl OsInfo {
    pub fn detect() -> Self {
        let os_type = PlatformId::current();
        let distro = match os_type {
            PlatformId::Linux => detect_linux_distro(Path::new("/")),
            _ => "unknown".to_string(),
        };

        Self {
            os_type,
            distro,
            version: sysinfo::System::os_version().unwrap_or_else(|| "unknown".to_string()),
            architecture: std::env::consts::ARCH.to_string(),
        }
    }
}

/// Distro id for a filesystem rooted at `root`
pub fn detect_linux_distro(root: &Path) -> String {
    if let Ok(contents) = std::fs::read_to_string(root.join("etc/os-release")) {
        if let Some(id) = parse_os_release_id(&contents) {
            return id;
        }
    }

    DISTRO_MARKERS
        .iter()
        .find(|(marker, _)| root.join(marker.trim_start_matches('/')).exists())
        .map(|(_, distro)| distro.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Extract the `ID=` value from os-release contents
pub fn parse_os_release_id(contents: &str) -> Option<String> {
    contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("ID="))
        .map(|value| value.trim().trim_matches('"').trim_matches('\'').to_lowercase())
        .find(|value| !value.is_empty())
}
