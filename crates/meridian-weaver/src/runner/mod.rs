//! Capability interface to the external validation tool.

mod process;

use async_trait::async_trait;
use semver::Version;

pub use process::ProcessRunner;
pub(crate) use process::run_tool;

use crate::batch::TelemetryBatch;
use crate::error::ToolError;
use crate::report::RawReport;

/// The two calls made to the validation tool.
///
/// Production uses [`ProcessRunner`]; tests substitute in-memory fakes.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Ask the tool for its version.
    async fn check_available(&self) -> Result<Version, ToolError>;

    /// Submit a batch for live checking and return the raw output.
    async fn check(&self, batch: &TelemetryBatch<'_>) -> Result<RawReport, ToolError>;
}

/// Extract a semantic version from `--version` output such as
/// `weaver 0.16.1` or `weaver v0.16.1 (abc123)`.
pub fn parse_version(output: &str) -> Result<Version, ToolError> {
    output
        .split_whitespace()
        .find_map(|token| Version::parse(token.trim_start_matches('v')).ok())
        .ok_or_else(|| ToolError::MalformedOutput(format!("no version in {:?}", output.trim())))
}
