//! `medicctl health`

use super::Context;
use crate::errors::exit_code_for_severity;
use crate::output;
use anyhow::Result;
use medic_common::health::HealthChecker;
use medic_common::{aggregate, SystemRunner};

pub async fn run(
    ctx: &Context,
    services: &[String],
    ports: &[u16],
    hosts: &[String],
) -> Result<i32> {
    let mut config = ctx.config.health.clone();
    extend_unique(&mut config.services, services);
    extend_unique(&mut config.ports, ports);
    extend_unique(&mut config.hosts, hosts);

    let checker = HealthChecker::new(SystemRunner);
    let tree = checker.run_all_checks(&config).await;
    let overall = aggregate(&tree);

    if ctx.json {
        output::print_json(&tree)?;
    } else {
        output::render_health(&tree, overall);
    }
    Ok(exit_code_for_severity(overall))
}

/// Append CLI values to configured ones, keeping the first occurrence
fn extend_unique<T: Clone + PartialEq>(target: &mut Vec<T>, extra: &[T]) {
    for item in extra {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}
