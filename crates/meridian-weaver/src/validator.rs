//! Orchestration of tool probing, local rule matching and live checks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use meridian_trace::{Metric, Span};
use semver::{Version, VersionReq};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::batch::TelemetryBatch;
use crate::config::WeaverConfig;
use crate::conformance;
use crate::error::{ConfigError, ToolError};
use crate::registry::ConventionRegistry;
use crate::report::{ComplianceOutcome, ComplianceReport};
use crate::runner::{ProcessRunner, ToolRunner};
use crate::session::ValidationSession;

/// Semantic-convention validator backed by an external tool.
#[derive(Clone)]
pub struct WeaverValidator {
    runner: Arc<dyn ToolRunner>,
    version_req: VersionReq,
    timeout: Duration,
    required: bool,
}

impl std::fmt::Debug for WeaverValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeaverValidator")
            .field("version_req", &self.version_req)
            .field("timeout", &self.timeout)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

impl WeaverValidator {
    pub fn new(runner: Arc<dyn ToolRunner>, version_req: VersionReq) -> Self {
        Self {
            runner,
            version_req,
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
            required: false,
        }
    }

    /// Build a validator that runs the configured binary.
    pub fn from_config(config: &WeaverConfig) -> Result<Self, ConfigError> {
        let version_req = VersionReq::parse(&config.version_req)
            .map_err(|e| ConfigError(format!("invalid version_req {:?}: {e}", config.version_req)))?;
        Ok(Self::new(Arc::new(ProcessRunner::from_config(config)), version_req)
            .with_timeout(config.timeout())
            .with_required(config.required))
    }

    /// Upper bound on each tool call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Make tool failures hard errors instead of skipping the check.
    #[must_use]
    pub const fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Query the tool and check its version.
    ///
    /// Failure is advisory: callers normally skip semantic validation rather
    /// than fail.
    #[instrument(skip(self), fields(version_req = %self.version_req))]
    pub async fn check_weaver_available(&self) -> Result<Version, ToolError> {
        let version = self.bounded(self.runner.check_available()).await?;
        if !self.version_req.matches(&version) {
            return Err(ToolError::VersionMismatch {
                found: version.to_string(),
                required: self.version_req.to_string(),
            });
        }
        debug!(%version, "validation tool compatible");
        Ok(version)
    }

    /// Check spans and metrics against the registry and the tool.
    ///
    /// Local rule violations and violation-level tool advice are merged and
    /// deduplicated by entity, attribute and reason.
    #[instrument(skip_all, fields(spans = spans.len(), metrics = metrics.len()))]
    pub async fn live_check(
        &self,
        registry: &ConventionRegistry,
        spans: &[Span],
        metrics: &[Metric],
    ) -> Result<ComplianceReport, ToolError> {
        let mut report = conformance::evaluate(registry, spans, metrics);

        let batch = TelemetryBatch::new(spans, metrics);
        let raw = self.bounded(self.runner.check(&batch)).await?;
        report.extend(raw.violations()?);

        info!(
            checked = report.checked_count,
            violations = report.violations.len(),
            "live check complete"
        );
        Ok(report)
    }

    /// Check the tool, load the session registry and live check.
    ///
    /// Tool failures produce [`ComplianceOutcome::Skipped`] unless the
    /// validator is `required`. Registry load failures are always errors.
    pub async fn run_compliance_check(
        &self,
        session: &ValidationSession,
        spans: &[Span],
        metrics: &[Metric],
    ) -> Result<ComplianceOutcome, ToolError> {
        if let Err(e) = self.check_weaver_available().await {
            return self.skip_or_fail(e);
        }

        let registry = session.registry().await?;
        match self.live_check(registry, spans, metrics).await {
            Ok(report) => Ok(ComplianceOutcome::Checked(report)),
            Err(e) => self.skip_or_fail(e),
        }
    }

    fn skip_or_fail(&self, error: ToolError) -> Result<ComplianceOutcome, ToolError> {
        if self.required || !error.is_soft() {
            return Err(error);
        }
        warn!(error = %error, "semantic validation skipped");
        Ok(ComplianceOutcome::Skipped {
            reason: error.to_string(),
        })
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ToolError>>,
    ) -> Result<T, ToolError> {
        timeout(self.timeout, call)
            .await
            .map_err(|_| ToolError::Timeout {
                limit: self.timeout,
            })?
    }
}
