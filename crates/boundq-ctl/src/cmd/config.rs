//! Config file commands.

use anyhow::{Context, Result};

use boundq_core::config::BoundqConfig;

/// Write the default config file unless one exists, then print its path.
pub fn cmd_config_init() -> Result<()> {
    let path = BoundqConfig::write_default_if_missing().context("failed to write default config")?;
    println!("Config file: {}", path.display());
    Ok(())
}
