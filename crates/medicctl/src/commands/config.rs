//! `medicctl config`

use super::Context;
use crate::errors::EXIT_SUCCESS;
use crate::output;
use anyhow::{bail, Context as _, Result};
use medic_common::MedicConfig;
use std::path::{Path, PathBuf};

/// Print the effective configuration
pub fn show(ctx: &Context) -> Result<i32> {
    if ctx.json {
        output::print_json(&ctx.config)?;
    } else {
        let toml = ctx
            .config
            .to_toml()
            .context("Failed to serialize configuration")?;
        print!("{}", toml);
    }
    Ok(EXIT_SUCCESS)
}

/// Write the default configuration to `path` or the user config location
pub fn init(path: Option<&Path>, force: bool) -> Result<i32> {
    let path: PathBuf = match path {
        Some(path) => path.to_path_buf(),
        None => MedicConfig::user_config_path().context("Cannot locate user config directory")?,
    };
    write_default(&path, force)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(EXIT_SUCCESS)
}

fn write_default(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    MedicConfig::default()
        .save_to(path)
        .with_context(|| format!("Failed to write config to {}", path.display()))
}
