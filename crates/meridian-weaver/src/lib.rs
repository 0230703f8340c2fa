//! Meridian Weaver - semantic-convention conformance checking.
//!
//! Checks recorded spans and metrics against a convention registry and an
//! external live-check tool:
//! - [`ConventionRegistry`] rules loaded through a [`ValidationSession`]
//! - [`ToolRunner`] capability with a subprocess implementation
//! - [`WeaverValidator`] producing a [`ComplianceReport`]
//!
//! The tool is optional. When it is missing or misbehaves the check is
//! reported as [`ComplianceOutcome::Skipped`] and structural validation in
//! `meridian-trace` is unaffected.

pub mod batch;
pub mod config;
pub mod conformance;
pub mod error;
pub mod registry;
pub mod report;
pub mod runner;
pub mod session;
pub mod validator;

pub use batch::TelemetryBatch;
pub use config::{CheckConfig, RegistryConfig, WeaverConfig};
pub use error::{ConfigError, RegistryError, ToolError};
pub use registry::{ConventionRegistry, ConventionRule, ExpectedKind, RegistrySource};
pub use report::{ComplianceOutcome, ComplianceReport, EntityKind, RawReport, Violation};
pub use runner::{parse_version, ProcessRunner, ToolRunner};
pub use session::ValidationSession;
pub use validator::WeaverValidator;
