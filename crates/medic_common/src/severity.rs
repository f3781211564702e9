//! Severity rollup over nested check results
//!
//! Health checks and bottleneck checks produce loosely structured JSON trees:
//! services keyed by name, ports keyed by number, disks keyed by mount path.
//! Any object carrying a `status` label is a leaf whose label summarizes its
//! own children. The overall status of a tree is the worst label found.
//!
//! This is the single severity ordering for the whole workspace. Health,
//! performance and network code all map onto it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Root-level keys that describe a report rather than a check
pub const DEFAULT_IGNORED_ROOT_KEYS: &[&str] = &["timestamp", "system_info", "overall_status"];

/// Field that marks an object as a labeled check result
pub const DEFAULT_STATUS_KEY: &str = "status";

/// Totally ordered status label: ok < warning < error < critical
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Ok,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Ok,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// Numeric rank, 0 for ok up to 3 for critical
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Lenient parse: unrecognized labels count as ok and never raise an aggregate
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }

    /// Worst severity in an iterator, ok when empty
    pub fn worst<I: IntoIterator<Item = Severity>>(items: I) -> Self {
        items.into_iter().max().unwrap_or_default()
    }

    pub fn is_ok(&self) -> bool {
        *self == Self::Ok
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown severity label: {0}")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Self::Ok),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            other => Err(UnknownSeverity(other.to_string())),
        }
    }
}

/// Worst-of-severity walk over a check tree
#[derive(Debug, Clone)]
pub struct Aggregator {
    ignored_root_keys: BTreeSet<String>,
    status_key: String,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::with_ignored_root_keys(DEFAULT_IGNORED_ROOT_KEYS.iter().copied())
    }
}

impl Aggregator {
    /// Aggregator with the default ignored root keys and `status` label field
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregator that skips exactly `keys` at the root
    pub fn with_ignored_root_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored_root_keys: keys.into_iter().map(Into::into).collect(),
            status_key: DEFAULT_STATUS_KEY.to_string(),
        }
    }

    pub fn ignore_root_key(mut self, key: impl Into<String>) -> Self {
        self.ignored_root_keys.insert(key.into());
        self
    }

    /// Use a different field as the leaf label
    pub fn status_key(mut self, key: impl Into<String>) -> Self {
        self.status_key = key.into();
        self
    }

    /// Worst label anywhere in `tree`, ok if nothing is labeled
    pub fn aggregate(&self, tree: &Value) -> Severity {
        match tree {
            Value::Object(map) => Severity::worst(
                map.iter()
                    .filter(|(key, _)| !self.ignored_root_keys.contains(key.as_str()))
                    .map(|(_, value)| self.walk(value)),
            ),
            other => self.walk(other),
        }
    }

    fn walk(&self, node: &Value) -> Severity {
        match node {
            // A labeled object is a leaf: its label already summarizes its children
            Value::Object(map) => match map.get(&self.status_key) {
                Some(label) => label.as_str().map(Severity::from_label).unwrap_or_default(),
                None => Severity::worst(map.values().map(|value| self.walk(value))),
            },
            Value::Array(items) => Severity::worst(items.iter().map(|item| self.walk(item))),
            _ => Severity::Ok,
        }
    }
}

/// Aggregate with the default ignored root keys
pub fn aggregate(tree: &Value) -> Severity {
    Aggregator::default().aggregate(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ordering() {
        assert!(Severity::Ok < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
        assert_eq!(Severity::Critical.rank(), 3);
    }

    #[test]
    fn test_label_parsing() {
        assert_eq!("critical".parse::<Severity>(), Ok(Severity::Critical));
        assert!("running".parse::<Severity>().is_err());
        assert_eq!(Severity::from_label("unknown"), Severity::Ok);
        assert_eq!(Severity::from_label("warning"), Severity::Warning);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "\"warning\"");
        let parsed: Severity = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(parsed, Severity::Error);
    }

    #[test]
    fn test_empty_tree_is_ok() {
        assert_eq!(aggregate(&json!({})), Severity::Ok);
        assert_eq!(aggregate(&json!([])), Severity::Ok);
    }

    #[test]
    fn test_worst_label_wins() {
        let tree = json!({
            "disk": {"status": "warning"},
            "mem": {"status": "ok"},
            "svc": {"a": {"status": "critical"}}
        });
        assert_eq!(aggregate(&tree), Severity::Critical);
    }

    #[test]
    fn test_labeled_node_is_not_expanded() {
        let tree = json!({"check": {"status": "ok", "nested": {"status": "critical"}}});
        assert_eq!(aggregate(&tree), Severity::Ok);
    }

    #[test]
    fn test_ignored_root_keys() {
        let tree = json!({
            "timestamp": "2025-11-02T10:00:00",
            "system_info": {"status": "critical"},
            "overall_status": {"status": "critical"},
            "uptime": {"status": "ok"}
        });
        assert_eq!(aggregate(&tree), Severity::Ok);

        // Only skipped at the root
        let nested = json!({"checks": {"system_info": {"status": "error"}}});
        assert_eq!(aggregate(&nested), Severity::Error);
    }

    #[test]
    fn test_unknown_and_non_string_labels_count_as_ok() {
        let tree = json!({
            "a": {"status": "unknown"},
            "b": {"status": 3},
            "c": {"status": null}
        });
        assert_eq!(aggregate(&tree), Severity::Ok);
    }

    #[test]
    fn test_sequences_are_walked() {
        let tree = json!({
            "partitions": [
                {"status": "ok"},
                [{"status": "error"}],
                "free text"
            ]
        });
        assert_eq!(aggregate(&tree), Severity::Error);
    }

    #[test]
    fn test_order_independent() {
        let forward = json!({"x": {"status": "warning"}, "y": [{"status": "error"}, {"status": "ok"}]});
        let reversed = json!({"y": [{"status": "ok"}, {"status": "error"}], "x": {"status": "warning"}});
        assert_eq!(aggregate(&forward), aggregate(&reversed));
    }

    #[test]
    fn test_root_scalars_are_ignored() {
        let tree = json!({"status": "critical", "note": "No services specified for checking"});
        assert_eq!(aggregate(&tree), Severity::Ok);
    }

    #[test]
    fn test_custom_status_key_and_ignored_keys() {
        let aggregator = Aggregator::with_ignored_root_keys(["summary"]).status_key("health_status");
        let tree = json!({
            "summary": {"health_status": "critical"},
            "sshd": {"health_status": "warning", "status": "critical"}
        });
        assert_eq!(aggregator.aggregate(&tree), Severity::Warning);

        let aggregator = Aggregator::new().ignore_root_key("disk_space");
        let tree = json!({"disk_space": {"/": {"status": "critical"}}, "uptime": {"status": "ok"}});
        assert_eq!(aggregator.aggregate(&tree), Severity::Ok);
    }

    #[test]
    fn test_aggregate_dominates_every_leaf() {
        let tree = json!({
            "a": {"b": {"c": {"status": "warning"}}, "d": [{"status": "error"}]},
            "e": {"status": "ok"}
        });
        let overall = aggregate(&tree);
        for leaf in [Severity::Warning, Severity::Error, Severity::Ok] {
            assert!(overall >= leaf);
        }
        assert_eq!(overall, Severity::Error);
    }
}
