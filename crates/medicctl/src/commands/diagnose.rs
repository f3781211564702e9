//! `medicctl diagnose`

use super::Context;
use crate::errors::exit_code_for_severity;
use crate::output;
use anyhow::Result;
use medic_common::network::NetworkDiagnostics;
use medic_common::SystemRunner;

pub async fn run(ctx: &Context, hosts: &[String]) -> Result<i32> {
    let network = ctx.config.network.clone();
    let hosts = if hosts.is_empty() {
        network.target_hosts.clone()
    } else {
        hosts.to_vec()
    };

    let diagnostics = NetworkDiagnostics::new(SystemRunner, network);
    let report = diagnostics.run_full_diagnostics(&hosts).await;

    if ctx.json {
        output::print_json(&report)?;
    } else {
        output::render_network_report(&report);
    }
    Ok(exit_code_for_severity(report.overall_status.severity()))
}
