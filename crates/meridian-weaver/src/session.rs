//! Validation sessions owning a lazily loaded registry.

use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::{CheckConfig, DEFAULT_TIMEOUT_SECS};
use crate::error::RegistryError;
use crate::registry::{ConventionRegistry, RegistrySource, RuleFormat};
use crate::runner::run_tool;

/// One validation run.
///
/// The registry is loaded on first use and reused for the rest of the
/// session. Sessions never share a registry; dropping the session drops it.
#[derive(Debug)]
pub struct ValidationSession {
    source: RegistrySource,
    timeout: Duration,
    registry: OnceCell<ConventionRegistry>,
}

impl ValidationSession {
    pub fn new(source: RegistrySource) -> Self {
        Self {
            source,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            registry: OnceCell::new(),
        }
    }

    /// Session over a registry that is already loaded.
    #[must_use]
    pub fn with_registry(registry: ConventionRegistry) -> Self {
        Self {
            source: RegistrySource::Rules(Vec::new()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            registry: OnceCell::new_with(Some(registry)),
        }
    }

    #[must_use]
    pub fn from_config(config: &CheckConfig) -> Self {
        Self::new(config.registry.clone().into()).with_timeout(config.weaver.timeout())
    }

    /// Time limit for command-sourced registry loads.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The session's registry, loading it on first call.
    ///
    /// Concurrent first callers wait on a single load. A failed load is not
    /// cached, so a later call retries.
    pub async fn registry(&self) -> Result<&ConventionRegistry, RegistryError> {
        self.registry.get_or_try_init(|| self.load()).await
    }

    /// Whether the registry has been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.registry.initialized()
    }

    async fn load(&self) -> Result<ConventionRegistry, RegistryError> {
        let registry = match &self.source {
            RegistrySource::Rules(rules) => ConventionRegistry::from_rules(rules.iter().cloned())?,
            RegistrySource::File(path) => {
                let format = RuleFormat::from_path(path)?;
                let content = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| RegistryError::Read {
                        path: path.clone(),
                        source,
                    })?;
                ConventionRegistry::parse(&content, format, &path.display().to_string())?
            }
            RegistrySource::Command { program, args } => {
                debug!(%program, "loading registry from command");
                let command_err = |message: String| RegistryError::Command {
                    program: program.clone(),
                    message,
                };
                let output = run_tool(program, args, None, self.timeout)
                    .await
                    .map_err(|e| command_err(e.to_string()))?;
                if !output.status.success() {
                    return Err(command_err(format!(
                        "exit code {}: {}",
                        output.status.code().unwrap_or(-1),
                        output.stderr.trim()
                    )));
                }
                ConventionRegistry::parse(&output.stdout, RuleFormat::Json, program)?
            }
        };

        info!(rules = registry.len(), "convention registry loaded");
        Ok(registry)
    }
}
