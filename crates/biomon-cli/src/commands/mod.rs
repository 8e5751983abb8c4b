pub mod config;
pub mod replay;

use anyhow::Result;
use biomon_core::{default_config_path, MonitorConfig};
use std::path::Path;

/// An explicit path must exist; the default location may be absent.
fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    match path {
        Some(path) => MonitorConfig::load(path),
        None => MonitorConfig::load_or_default(&default_config_path()?),
    }
}
