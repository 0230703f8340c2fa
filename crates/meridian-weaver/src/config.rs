//! Configuration for conformance checking.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::error::ConfigError;

// ============================================================================
// Default configuration constants
// ============================================================================

/// Default validation tool binary, resolved through `PATH`.
pub const DEFAULT_WEAVER_BINARY: &str = "weaver";

/// Default supported tool version range.
pub const DEFAULT_VERSION_REQ: &str = ">=0.10.0";

/// Default per-invocation timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default path of the semantic-convention registry passed to the tool.
pub const DEFAULT_TOOL_REGISTRY: &str = "./semconv";

/// Default local convention rule file.
pub const DEFAULT_RULES_PATH: &str = "./semconv-rules.toml";

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "meridian.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// External tool settings.
    pub weaver: WeaverConfig,
    /// Where convention rules come from.
    pub registry: RegistryConfig,
}

impl CheckConfig {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in order (later sources override earlier):
    /// 1. Default values
    /// 2. `meridian.toml` in current directory
    /// 3. Environment variables prefixed with `MERIDIAN_`, nested with `__`
    ///    (e.g. `MERIDIAN_WEAVER__TIMEOUT_SECS=10`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("MERIDIAN_").split("__"))
            .extract()
            .map_err(|e| ConfigError(e.to_string()))
    }
}

/// External validation tool configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeaverConfig {
    /// Binary name (looked up in `PATH`) or absolute path.
    pub binary: String,
    /// Semver requirement the tool's reported version must satisfy.
    pub version_req: String,
    /// Timeout applied to every tool invocation.
    pub timeout_secs: u64,
    /// Registry location handed to the tool.
    pub registry: String,
    /// Full argument list for the live-check call. Empty selects the
    /// built-in `registry live-check` invocation.
    pub live_check_args: Vec<String>,
    /// Treat tool failures as hard errors instead of skipping the check.
    ///
    /// Useful in CI where the tool is known to be installed.
    pub required: bool,
}

impl WeaverConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Arguments for the live-check invocation.
    #[must_use]
    pub fn live_check_args(&self) -> Vec<String> {
        if !self.live_check_args.is_empty() {
            return self.live_check_args.clone();
        }
        [
            "registry",
            "live-check",
            "--registry",
            &self.registry,
            "--input-source",
            "stdin",
            "--input-format",
            "json",
            "--format",
            "json",
        ]
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
    }
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_WEAVER_BINARY.to_owned(),
            version_req: DEFAULT_VERSION_REQ.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            registry: DEFAULT_TOOL_REGISTRY.to_owned(),
            live_check_args: Vec::new(),
            required: false,
        }
    }
}

/// Source of local convention rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RegistryConfig {
    /// TOML or JSON rule file.
    File {
        /// Path to the file.
        path: PathBuf,
    },
    /// External command that prints a JSON rule listing on stdout.
    Command {
        /// Program to run.
        program: String,
        /// Program arguments.
        #[serde(default)]
        args: Vec<String>,
    },
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::File {
            path: PathBuf::from(DEFAULT_RULES_PATH),
        }
    }
}
