//! Destructive operations table
//!
//! Whether an action needs confirmation is decided by its name, not by a flag
//! on the action, so catalogs cannot accidentally drop the guard.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskRating {
    Medium,
    High,
}

impl fmt::Display for RiskRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Medium => f.write_str("MEDIUM RISK"),
            Self::High => f.write_str("HIGH RISK"),
        }
    }
}

/// Warning metadata shown before a destructive action runs
#[derive(Debug, Clone, Serialize)]
pub struct DestructiveOperation {
    pub name: &'static str,
    pub description: &'static str,
    pub warning: &'static str,
    pub risk: RiskRating,
    /// Impact text without the risk prefix
    pub consequence: &'static str,
    /// Full impact line, e.g. "HIGH RISK - May break network access ..."
    pub impact: &'static str,
}

static DESTRUCTIVE_OPERATIONS: &[DestructiveOperation] = &[
    DestructiveOperation {
        name: "reset_firewall",
        description: "Reset Windows Firewall to defaults",
        warning: "This will remove ALL custom firewall rules and may affect VPN, remote access, and security policies.",
        risk: RiskRating::High,
        consequence: "May break network access for applications and services",
        impact: "HIGH RISK - May break network access for applications and services",
    },
    DestructiveOperation {
        name: "reset_tcp_ip_stack",
        description: "Reset TCP/IP stack",
        warning: "This will reset all TCP/IP settings and may require a system restart.",
        risk: RiskRating::Medium,
        consequence: "May cause temporary network disconnection",
        impact: "MEDIUM RISK - May cause temporary network disconnection",
    },
    DestructiveOperation {
        name: "disable_enable_adapter",
        description: "Disable and re-enable network adapter",
        warning: "This will temporarily disconnect all network access.",
        risk: RiskRating::Medium,
        consequence: "Brief network interruption (5-10 seconds)",
        impact: "MEDIUM RISK - Brief network interruption (5-10 seconds)",
    },
    DestructiveOperation {
        name: "reset_network_adapter",
        description: "Reset network adapter configuration",
        warning: "This will reset Winsock settings and may affect network connectivity.",
        risk: RiskRating::Medium,
        consequence: "May require restart for full effect",
        impact: "MEDIUM RISK - May require restart for full effect",
    },
];

pub fn all() -> &'static [DestructiveOperation] {
    DESTRUCTIVE_OPERATIONS
}

pub fn lookup(action_name: &str) -> Option<&'static DestructiveOperation> {
    DESTRUCTIVE_OPERATIONS.iter().find(|op| op.name == action_name)
}

pub fn is_destructive(action_name: &str) -> bool {
    lookup(action_name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let op = lookup("reset_firewall").unwrap();
        assert_eq!(op.risk, RiskRating::High);
        assert!(op.impact.starts_with("HIGH RISK"));
        assert!(lookup("flush_dns_cache").is_none());
        assert!(!is_destructive("reset_winsock"));
    }

    #[test]
    fn test_impact_matches_risk_and_consequence() {
        for op in all() {
            assert_eq!(op.impact, format!("{} - {}", op.risk, op.consequence));
        }
    }
}
