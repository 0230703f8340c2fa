//! Subprocess-backed tool runner.

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use semver::Version;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use super::{parse_version, ToolRunner};
use crate::batch::TelemetryBatch;
use crate::config::WeaverConfig;
use crate::error::ToolError;
use crate::report::RawReport;

/// Runs the validation tool as a child process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    binary: String,
    live_check_args: Vec<String>,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(binary: impl Into<String>, live_check_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            live_check_args,
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(config: &WeaverConfig) -> Self {
        Self::new(config.binary.clone(), config.live_check_args(), config.timeout())
    }

    fn resolve(&self) -> Result<PathBuf, ToolError> {
        which::which(&self.binary).map_err(|e| {
            debug!(binary = %self.binary, error = %e, "validation tool not on PATH");
            ToolError::NotFound {
                binary: self.binary.clone(),
            }
        })
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    #[instrument(skip(self), fields(binary = %self.binary))]
    async fn check_available(&self) -> Result<Version, ToolError> {
        let path = self.resolve()?;
        let output = run_tool(&path, &["--version".to_owned()], None, self.timeout).await?;
        if !output.status.success() {
            return Err(ToolError::Failed {
                exit_code: output.status.code().unwrap_or(-1),
                stderr: output.stderr,
            });
        }
        let version = parse_version(&output.stdout)?;
        debug!(%version, "validation tool available");
        Ok(version)
    }

    #[instrument(skip(self, batch), fields(binary = %self.binary, entities = batch.len()))]
    async fn check(&self, batch: &TelemetryBatch<'_>) -> Result<RawReport, ToolError> {
        let path = self.resolve()?;
        let input = serde_json::to_vec(batch)?;
        let output = run_tool(&path, &self.live_check_args, Some(input), self.timeout).await?;

        // Live check exits non-zero when it finds violations, so a report
        // on stdout wins over the exit status.
        if !output.status.success() && output.stdout.trim().is_empty() {
            return Err(ToolError::Failed {
                exit_code: output.status.code().unwrap_or(-1),
                stderr: output.stderr,
            });
        }
        Ok(RawReport::new(output.stdout))
    }
}

/// Captured result of a finished tool process.
#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Spawn `program`, feed it `input` on stdin, and wait up to `limit`.
///
/// The child is killed if the limit is exceeded or the future is dropped.
pub(crate) async fn run_tool(
    program: impl AsRef<OsStr>,
    args: &[String],
    input: Option<Vec<u8>>,
    limit: Duration,
) -> Result<ToolOutput, ToolError> {
    let program = program.as_ref();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(program = %program.to_string_lossy(), ?args, "spawning tool");
    let start = Instant::now();

    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        ErrorKind::NotFound => ToolError::NotFound {
            binary: program.to_string_lossy().into_owned(),
        },
        _ => ToolError::Io(e),
    })?;

    if let (Some(mut stdin), Some(bytes)) = (child.stdin.take(), input) {
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&bytes).await {
                debug!(error = %e, "tool closed stdin early");
            }
        });
    }

    let stdout_task = tokio::spawn(read_all(child.stdout.take()));
    let stderr_task = tokio::spawn(read_all(child.stderr.take()));

    let status = match timeout(limit, child.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => return Err(ToolError::Io(e)),
        Err(_) => {
            warn!(program = %program.to_string_lossy(), ?limit, "tool timed out");
            child.kill().await.ok();
            return Err(ToolError::Timeout { limit });
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    debug!(
        exit_code = status.code(),
        duration_secs = start.elapsed().as_secs_f32(),
        "tool finished"
    );

    Ok(ToolOutput {
        status,
        stdout,
        stderr,
    })
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut reader) = reader {
        reader.read_to_string(&mut buf).await.ok();
    }
    buf
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_owned(), script.to_owned()]
    }

    #[tokio::test]
    async fn captures_stdout_and_stdin() {
        let output = run_tool(
            "sh",
            &sh("cat; echo done >&2"),
            Some(b"hello".to_vec()),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(output.status.success());
        assert_eq!(output.stdout, "hello");
        assert_eq!(output.stderr.trim(), "done");
    }

    #[tokio::test]
    async fn missing_program_is_not_found() {
        let err = run_tool(
            "meridian-definitely-missing-tool",
            &[],
            None,
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }

    #[tokio::test]
    async fn slow_program_times_out() {
        let limit = Duration::from_millis(100);
        let err = run_tool("sh", &sh("sleep 5"), None, limit).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout { limit: l } if l == limit));
    }

    #[tokio::test]
    async fn runner_reports_missing_binary() {
        let runner = ProcessRunner::new(
            "meridian-definitely-missing-tool",
            Vec::new(),
            Duration::from_secs(1),
        );
        assert!(matches!(
            runner.check_available().await,
            Err(ToolError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn nonzero_exit_with_report_is_a_report() {
        let runner = ProcessRunner::new(
            "sh",
            sh(r#"cat >/dev/null; echo '{"samples": []}'; exit 1"#),
            Duration::from_secs(5),
        );
        let raw = runner.check(&TelemetryBatch::new(&[], &[])).await.unwrap();
        assert!(raw.violations().unwrap().is_empty());
    }

    #[tokio::test]
    async fn nonzero_exit_without_report_fails() {
        let runner = ProcessRunner::new(
            "sh",
            sh("cat >/dev/null; echo boom >&2; exit 3"),
            Duration::from_secs(5),
        );
        let err = runner.check(&TelemetryBatch::new(&[], &[])).await.unwrap_err();
        assert!(matches!(err, ToolError::Failed { exit_code: 3, ref stderr } if stderr.trim() == "boom"));
    }
}
