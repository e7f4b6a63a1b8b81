//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod pipeline;
pub mod process;
pub mod schema;

use std::path::Path;

use tracing::debug;

use formx_core::FormxConfig;

/// Load the configuration from `--config`, the default location, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FormxConfig> {
    if let Some(path) = config_path {
        return Ok(FormxConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Using configuration from {}", default_path.display());
        Ok(FormxConfig::from_file(&default_path)?)
    } else {
        Ok(FormxConfig::default())
    }
}
