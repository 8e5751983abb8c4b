//! Configuration inspection command

use anyhow::Result;
use std::path::Path;

/// Load the monitor configuration and print it with defaults filled in
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded
pub fn check_config_command(path: Option<&Path>) -> Result<()> {
    let config = super::load_config(path)?;
    let constants = config.constants();

    log::info!("Configuration OK for {} sessions", constants.log_tag());
    println!("{}", config.to_toml()?);
    Ok(())
}
