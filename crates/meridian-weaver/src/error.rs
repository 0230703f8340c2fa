//! Error types for registry loading and external tool integration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors from the external validation tool.
///
/// By convention these are soft failures: callers degrade to "semantic
/// validation skipped" rather than failing outright. The exception is
/// [`ToolError::Registry`], which means the session itself is misconfigured.
#[derive(Debug, Error)]
pub enum ToolError {
    // ─────────────────────────────────────────────────────────────────────────
    // Availability
    // ─────────────────────────────────────────────────────────────────────────
    /// The tool binary could not be located or spawned.
    #[error("validation tool not found: {binary}")]
    NotFound {
        /// Binary name or path that was searched for.
        binary: String,
    },

    /// The tool runs but its version is outside the supported range.
    #[error("validation tool version {found} does not satisfy {required}")]
    VersionMismatch {
        /// Reported version.
        found: String,
        /// Configured requirement.
        required: String,
    },

    /// The tool did not finish within the allotted time.
    #[error("validation tool timed out after {limit:?}")]
    Timeout {
        /// Time limit that was exceeded.
        limit: Duration,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Execution
    // ─────────────────────────────────────────────────────────────────────────
    /// The tool exited unsuccessfully without producing a report.
    #[error("validation tool failed (exit code {exit_code}): {stderr}")]
    Failed {
        /// Process exit code, or -1 if killed by a signal.
        exit_code: i32,
        /// Captured stderr.
        stderr: String,
    },

    /// The tool's output could not be understood.
    #[error("malformed tool output: {0}")]
    MalformedOutput(String),

    /// The telemetry batch could not be encoded for the tool.
    #[error("failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),

    /// I/O failure talking to the tool process.
    #[error("tool I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────────
    /// The convention registry could not be loaded.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ToolError {
    /// Whether this error means the tool simply is not usable here, as
    /// opposed to misbehaving once running.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::VersionMismatch { .. } | Self::Timeout { .. }
        )
    }

    /// Whether the degrade-gracefully policy applies to this error.
    #[must_use]
    pub const fn is_soft(&self) -> bool {
        !matches!(self, Self::Registry(_))
    }
}

/// Errors loading a convention registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Registry file could not be read.
    #[error("failed to read registry {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Registry content could not be parsed.
    #[error("failed to parse registry {origin}: {message}")]
    Parse {
        /// File path or command that produced the content.
        origin: String,
        /// Parser message.
        message: String,
    },

    /// File extension is neither TOML nor JSON.
    #[error("unsupported registry format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Two rules share an attribute key.
    #[error("duplicate rule for attribute {0:?}")]
    DuplicateRule(String),

    /// A rule has an empty attribute key.
    #[error("rule with empty attribute key")]
    EmptyKey,

    /// The registry command failed.
    #[error("registry command {program} failed: {message}")]
    Command {
        /// Program that was run.
        program: String,
        /// Failure description.
        message: String,
    },
}

/// Invalid configuration.
#[derive(Debug, Error)]
#[error("configuration error: {0}")]
pub struct ConfigError(pub String);
