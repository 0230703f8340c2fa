//! Implementation of the `meridian probe` command.

use std::path::Path;

use meridian_weaver::{ConfigError, ToolError, WeaverValidator};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Probe the configured tool. Returns `false` when it is unusable.
pub async fn run(config_path: Option<&Path>) -> Result<bool, ProbeError> {
    let config = super::load_config(config_path)?;
    let validator = WeaverValidator::from_config(&config.weaver)?;

    match validator.check_weaver_available().await {
        Ok(version) => {
            println!(
                "{} {version} (satisfies {})",
                config.weaver.binary, config.weaver.version_req
            );
            Ok(true)
        }
        Err(e) if e.is_unavailable() && !config.weaver.required => {
            println!("unavailable: {e}");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
