//! `medicctl info`

use super::Context;
use crate::errors::EXIT_SUCCESS;
use crate::output;
use anyhow::{Context as _, Result};
use medic_common::inventory::InventoryGatherer;
use medic_common::SystemRunner;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub async fn run(
    ctx: &Context,
    top: Option<usize>,
    log_lines: Option<usize>,
    output_path: Option<&Path>,
) -> Result<i32> {
    let mut config = ctx.config.inventory.clone();
    if let Some(top) = top {
        config.top_processes = top;
    }
    if let Some(lines) = log_lines {
        config.log_lines = lines;
    }

    let mut gatherer = InventoryGatherer::new(SystemRunner, config);
    let report = gatherer.gather_all_info().await;

    if let Some(path) = output_path {
        write_json(path, &report)?;
        println!("System information saved to {}", path.display());
    } else if ctx.json {
        output::print_json(&report)?;
    } else {
        output::render_inventory(&report);
    }
    Ok(EXIT_SUCCESS)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
