//! Output formatting - plain terminal summaries and JSON
//!
//! Status tags are ASCII (`[OK]`, `[WARNING]`, ...) and only colored when the
//! configured color mode allows it.

use anyhow::{Context, Result};
use medic_common::config::ColorMode;
use medic_common::inventory::InventoryReport;
use medic_common::network::{NetworkHealth, NetworkReport};
use medic_common::network_repair::RepairOutcome;
use medic_common::performance::PerformanceReport;
use medic_common::severity::{DEFAULT_IGNORED_ROOT_KEYS, DEFAULT_STATUS_KEY};
use medic_common::{FixOutcome, FixSession, Severity};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;
use std::io::IsTerminal;
use std::sync::OnceLock;

static COLOR: OnceLock<bool> = OnceLock::new();

/// Decide once whether stdout gets colors
pub fn init_color(mode: ColorMode) {
    let enabled = match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
    };
    let _ = COLOR.set(enabled);
}

fn use_colors() -> bool {
    COLOR.get().copied().unwrap_or(false)
}

/// `[OK]`, `[WARNING]`, `[ERROR]` or `[CRITICAL]`
pub fn severity_tag(severity: Severity) -> String {
    let tag = format!("[{}]", severity.as_str().to_uppercase());
    if !use_colors() {
        return tag;
    }
    match severity {
        Severity::Ok => tag.bright_green().to_string(),
        Severity::Warning => tag.yellow().to_string(),
        Severity::Error => tag.bright_red().to_string(),
        Severity::Critical => tag.red().bold().to_string(),
    }
}

fn outcome_tag(outcome: FixOutcome) -> String {
    let (tag, severity) = match outcome {
        FixOutcome::Succeeded => ("[OK]", Severity::Ok),
        FixOutcome::Failed => ("[FAILED]", Severity::Error),
        FixOutcome::Skipped => ("[SKIPPED]", Severity::Warning),
        FixOutcome::Declined => ("[DECLINED]", Severity::Warning),
    };
    if !use_colors() {
        return tag.to_string();
    }
    match severity {
        Severity::Ok => tag.bright_green().to_string(),
        Severity::Warning => tag.yellow().to_string(),
        _ => tag.bright_red().to_string(),
    }
}

fn network_tag(health: NetworkHealth) -> String {
    let tag = format!("[{}]", health.as_str().to_uppercase());
    if !use_colors() {
        return tag;
    }
    match health.severity() {
        Severity::Ok => tag.bright_green().to_string(),
        Severity::Warning => tag.yellow().to_string(),
        _ => tag.bright_red().to_string(),
    }
}

fn heading(title: &str) {
    println!();
    if use_colors() {
        println!("{}", format!("=== {} ===", title).bold());
    } else {
        println!("=== {} ===", title);
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Labeled leaves of a check tree as dotted paths, in tree order
pub fn leaf_statuses(tree: &Value) -> Vec<(String, Severity)> {
    let mut leaves = Vec::new();
    if let Value::Object(map) = tree {
        for (key, value) in map {
            if !DEFAULT_IGNORED_ROOT_KEYS.contains(&key.as_str()) {
                collect_leaves(key.clone(), value, &mut leaves);
            }
        }
    }
    leaves
}

fn collect_leaves(path: String, node: &Value, leaves: &mut Vec<(String, Severity)>) {
    match node {
        Value::Object(map) => match map.get(DEFAULT_STATUS_KEY) {
            Some(label) => leaves.push((
                path,
                label.as_str().map(Severity::from_label).unwrap_or_default(),
            )),
            None => {
                for (key, value) in map {
                    collect_leaves(format!("{}.{}", path, key), value, leaves);
                }
            }
        },
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                collect_leaves(format!("{}[{}]", path, idx), item, leaves);
            }
        }
        _ => {}
    }
}

pub fn render_health(tree: &Value, overall: Severity) {
    heading("System Health Check");
    if let Some(info) = tree.get("system_info") {
        let field = |key: &str| info.get(key).and_then(Value::as_str).unwrap_or("unknown");
        println!(
            "System: {} {} on {} (up {})",
            field("distro"),
            field("version"),
            field("hostname"),
            field("uptime_human")
        );
    }
    println!();

    for (path, severity) in leaf_statuses(tree) {
        println!("  {:<12} {}", severity_tag(severity), path);
    }

    println!();
    println!("Overall status: {}", severity_tag(overall));
}

pub fn render_network_report(report: &NetworkReport) {
    heading("Network Diagnostics");

    let interfaces = &report.network_interfaces;
    match &interfaces.error {
        Some(error) => println!("Interfaces:   error ({})", error),
        None => println!("Interfaces:   {}", interfaces.count),
    }

    let dns = &report.dns_resolution;
    println!(
        "DNS:          {} resolved, {} failed",
        dns.successful_resolutions, dns.failed_resolutions
    );

    let conn = &report.connectivity_tests;
    println!(
        "Connectivity: {} reachable, {} unreachable",
        conn.successful_pings, conn.failed_pings
    );
    for (host, result) in &conn.details {
        let avg = result
            .statistics
            .as_ref()
            .and_then(|s| s.avg_response_time_ms)
            .map(|ms| format!(" ({:.1} ms)", ms))
            .unwrap_or_default();
        println!("  - {}: {:?}{}", host, result.status, avg);
    }

    let bandwidth = &report.bandwidth_test;
    match bandwidth.average_ping_ms {
        Some(avg) => println!(
            "Latency:      {} (average {:.1} ms)",
            bandwidth.assessment.as_str(),
            avg
        ),
        None => println!("Latency:      {}", bandwidth.assessment.as_str()),
    }

    if !report.port_scans.open_ports.is_empty() {
        let ports: Vec<String> = report
            .port_scans
            .open_ports
            .iter()
            .map(u16::to_string)
            .collect();
        println!(
            "Open ports on {}: {}",
            report.port_scans.host,
            ports.join(", ")
        );
    }

    println!();
    println!("Overall status: {}", network_tag(report.overall_status));
}

pub fn render_fix_session(session: &FixSession, pass: usize) {
    let mode = if session.dry_run { " (dry run)" } else { "" };
    heading(&format!("Fix pass {}{}", pass, mode));

    for result in &session.attempted {
        println!(
            "  {:<12} {} - {}",
            outcome_tag(result.outcome()),
            result.name,
            result.description
        );
        if let Some(error) = &result.error {
            println!("               {}", error);
        } else if session.dry_run {
            println!("               {}", result.output);
        }
    }

    println!();
    println!(
        "Attempted {}: {} succeeded, {} failed, {} skipped, {} declined",
        session.attempted.len(),
        session.successful.len(),
        session.failed.len(),
        session.skipped.len(),
        session.declined.len()
    );
    if session.requires_admin {
        println!("Note: some fixes require administrator privileges");
    }
}

pub fn render_repair_outcome(outcome: &RepairOutcome) {
    println!(
        "Initial network status: {}",
        network_tag(outcome.initial_report.overall_status)
    );

    for (idx, session) in outcome.sessions.iter().enumerate() {
        render_fix_session(session, idx + 1);
    }

    let summary = &outcome.summary;
    heading("Repair Summary");
    println!(
        "Status: {} -> {}",
        network_tag(summary.initial_status),
        network_tag(summary.final_status)
    );
    println!(
        "Fixes: {} attempted, {} successful",
        summary.total_fixes_attempted, summary.total_fixes_successful
    );
    for issue in &summary.issues_resolved {
        println!("  resolved:  {}", issue);
    }
    for issue in &summary.issues_remaining {
        println!("  remaining: {}", issue);
    }

    let mut recommendations: Vec<&String> = outcome
        .sessions
        .iter()
        .flat_map(|s| s.recommendations.iter())
        .chain(summary.recommendations.iter())
        .collect();
    recommendations.dedup();
    if !recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for rec in recommendations {
            println!("  * {}", rec);
        }
    }
}

pub fn render_performance(report: &PerformanceReport) {
    heading("Performance Analysis Summary");
    let info = &report.system_info;
    println!("System: {} on {}", info.distro, info.hostname);

    let snapshot = &report.snapshot;
    println!("CPU Usage: {:.1}%", snapshot.cpu.overall_usage_percent);
    println!(
        "Memory Usage: {:.1}% of {:.1}GB",
        snapshot.memory.used_percent, snapshot.memory.total_gb
    );
    println!("Processes: {}", snapshot.process_count);

    let b = &report.bottlenecks;
    println!();
    println!("Bottlenecks:");
    println!(
        "  {:<12} cpu     {}",
        severity_tag(b.cpu_bottleneck.status),
        b.cpu_bottleneck.description
    );
    println!(
        "  {:<12} memory  {:.1}% used, {:.1}% swap",
        severity_tag(b.memory_bottleneck.status),
        b.memory_bottleneck.memory_usage_percent,
        b.memory_bottleneck.swap_usage_percent
    );
    println!(
        "  {:<12} disk    {:.1}% max",
        severity_tag(b.disk_bottleneck.status),
        b.disk_bottleneck.max_disk_usage_percent
    );
    println!(
        "  {:<12} network {:.2} Mbps out, {:.2} Mbps in",
        severity_tag(b.network_bottleneck.status),
        b.network_bottleneck.mbps_sent,
        b.network_bottleneck.mbps_received
    );
    println!("Overall Assessment: {}", severity_tag(b.overall_assessment));

    let hogs = &report.resource_hogs;
    if !hogs.top_cpu_consumers.is_empty() {
        println!();
        println!("Top CPU consumers:");
        for p in &hogs.top_cpu_consumers {
            println!("  {:>7}  {:>5.1}%  {}", p.pid, p.cpu_percent, p.name);
        }
    }
    if !hogs.top_memory_consumers.is_empty() {
        println!();
        println!("Top memory consumers:");
        for p in &hogs.top_memory_consumers {
            println!("  {:>7}  {:>8.1} MB  {}", p.pid, p.memory_mb, p.name);
        }
    }

    if !report.recommendations.is_empty() {
        println!();
        println!("Top Recommendations:");
        for (idx, rec) in report.recommendations.iter().take(3).enumerate() {
            println!("{}. {}", idx + 1, rec);
        }
    }

    println!();
    println!("Timestamp: {}", report.timestamp);
}

pub fn render_inventory(report: &InventoryReport) {
    heading("System Information Summary");
    let basic = &report.basic_info;
    println!("Hostname: {}", basic.hostname);
    println!("OS: {} {}", basic.distro, basic.os_version);
    if let Some(kernel) = &basic.kernel_version {
        println!("Kernel: {}", kernel);
    }
    println!("Architecture: {}", basic.architecture);
    println!("Uptime: {}", basic.uptime_human);
    if let Some(user) = &basic.user.current_user {
        println!("User: {}", user);
    }

    let hw = &report.hardware_info;
    if let Some(product) = &hw.product_name {
        let vendor = hw.system_vendor.as_deref().unwrap_or("unknown vendor");
        println!("Machine: {} {}", vendor, product);
    }
    println!(
        "CPU: {} ({} cores), {:.1}% usage",
        hw.cpu.brand, hw.cpu.logical_cores, hw.cpu.usage_percent
    );
    println!(
        "Memory: {:.1}GB total, {:.1}% used",
        hw.memory.total_gb, hw.memory.used_percent
    );

    let storage = &report.storage_info;
    println!(
        "Storage: {:.1}GB total capacity, {:.1}GB used",
        storage.total_capacity_gb, storage.total_used_gb
    );
    for disk in &storage.disks {
        println!(
            "  {:<20} {:>8.1}GB {:>5.1}% used ({})",
            disk.mountpoint, disk.total_gb, disk.used_percent, disk.fstype
        );
    }

    let net = &report.network_info;
    let names: Vec<&str> = net.interfaces.iter().map(|i| i.name.as_str()).collect();
    println!("Interfaces: {}", names.join(", "));
    println!(
        "Traffic: {} sent, {} received",
        medic_common::format_bytes(net.statistics.bytes_sent),
        medic_common::format_bytes(net.statistics.bytes_received)
    );

    let processes = &report.process_info;
    println!("Processes: {}", processes.total_processes);
    for p in processes.top_cpu_processes.iter().take(5) {
        println!("  {:>7}  {:>5.1}%  {}", p.pid, p.cpu_percent, p.name);
    }

    let services = &report.service_info;
    match &services.error {
        Some(error) => println!("Services: unavailable ({})", error),
        None => println!(
            "Services: {} listed, {} running",
            services.total, services.running
        ),
    }
    for service in services.services.iter().filter(|s| s.state == "failed") {
        println!("  {:<12} {}", severity_tag(Severity::Error), service.name);
    }

    let logs = &report.log_info;
    match &logs.error {
        Some(error) => println!("Recent logs: unavailable ({})", error),
        None => {
            println!("Recent logs ({}):", logs.source);
            for line in &logs.lines {
                println!("  {}", line);
            }
        }
    }

    println!();
    println!("Timestamp: {}", report.timestamp);
}
