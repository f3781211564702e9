//! `medicctl repair`
//!
//! Dry run unless `--execute` is given. Destructive fixes are confirmed on
//! the terminal, or answered by `--on-destructive`.

use super::Context;
use crate::cli::{DestructivePolicy, RepairArgs};
use crate::errors::exit_code_for_severity;
use crate::output;
use crate::progress::{PassProgress, SuspendingConfirmer};
use anyhow::Result;
use medic_common::confirmation::Confirmer;
use medic_common::network::{NetworkDiagnostics, NetworkReport};
use medic_common::network_repair::NetworkRepair;
use medic_common::{
    ExecutorOptions, PlatformId, PolicyConfirmer, RemediationExecutor, SystemRunner,
    TerminalConfirmer,
};
use std::io::{self, IsTerminal};
use tracing::info;

pub async fn run(ctx: &Context, args: &RepairArgs) -> Result<i32> {
    let mut repair_config = ctx.config.repair.clone();
    if let Some(max_passes) = args.max_passes {
        repair_config.max_passes = max_passes;
    }

    let mut network = ctx.config.network.clone();
    if !args.hosts.is_empty() {
        network.target_hosts = args.hosts.clone();
    }

    let options = ExecutorOptions {
        dry_run: !args.execute,
        auto_approve_destructive: args.auto_approve_destructive,
        platform: PlatformId::current(),
        command_timeout: repair_config.command_timeout(),
    };
    if options.dry_run {
        info!("Dry run: no commands will be executed (pass --execute to apply fixes)");
    }

    let progress = PassProgress::new();
    let confirmer = SuspendingConfirmer::new(
        confirmer_for(args.on_destructive, ctx.json),
        progress.clone(),
    );

    let runner = SystemRunner;
    let mut executor = RemediationExecutor::new(&runner, confirmer, options);
    if show_progress(args, ctx.json) {
        executor = executor.with_observer(progress.observer());
    }

    let diagnostics = NetworkDiagnostics::new(&runner, network);
    let mut repair = NetworkRepair::new(executor, repair_config);
    let outcome = if args.skip_diagnostics {
        info!("Skipping diagnostics, assuming the network is broken");
        repair
            .repair_from(NetworkReport::assumed_broken(), &diagnostics)
            .await
    } else {
        repair.repair_until_healthy(&diagnostics).await
    };
    progress.finish();

    if ctx.json {
        output::print_json(&outcome)?;
    } else {
        output::render_repair_outcome(&outcome);
    }
    Ok(exit_code_for_severity(outcome.final_status().severity()))
}

/// Prompts go to stderr when stdout carries JSON
fn confirmer_for(policy: DestructivePolicy, json: bool) -> Box<dyn Confirmer> {
    match policy {
        DestructivePolicy::Ask if json => {
            Box::new(TerminalConfirmer::new(io::stdin().lock(), io::stderr()))
        }
        DestructivePolicy::Ask => Box::new(TerminalConfirmer::stdio()),
        DestructivePolicy::Decline => Box::new(PolicyConfirmer::always_decline()),
        DestructivePolicy::Skip => Box::new(PolicyConfirmer::always_skip()),
    }
}

fn show_progress(args: &RepairArgs, json: bool) -> bool {
    !args.no_progress && !json && io::stderr().is_terminal()
}
