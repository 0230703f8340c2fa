pub mod check;
pub mod probe;

use std::path::Path;

use meridian_weaver::{CheckConfig, ConfigError};

/// Load configuration from the given file, or the default one.
pub fn load_config(path: Option<&Path>) -> Result<CheckConfig, ConfigError> {
    match path {
        Some(path) => CheckConfig::load_from(path),
        None => CheckConfig::load(),
    }
}
