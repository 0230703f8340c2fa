//! Implementation of the `meridian check` command.

use std::path::{Path, PathBuf};

use meridian_trace::{Metric, MetricValidator, Span, SpanValidator};
use meridian_weaver::report::EntityKind;
use meridian_weaver::{
    ComplianceOutcome, ConfigError, ToolError, ValidationSession, WeaverValidator,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("failed to read batch {path}: {source}")]
    ReadBatch {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid batch {path}: {source}")]
    ParseBatch {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Telemetry recorded elsewhere and dumped to JSON.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BatchFile {
    pub spans: Vec<Span>,
    pub metrics: Vec<Metric>,
}

/// A structural validation failure.
#[derive(Debug, Serialize)]
pub struct StructuralFinding {
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
struct CheckSummary<'a> {
    structural: &'a [StructuralFinding],
    compliance: &'a ComplianceOutcome,
}

/// Run structural validation on every entity in the batch.
pub fn structural_findings(batch: &BatchFile) -> Vec<StructuralFinding> {
    let spans = batch.spans.iter().filter_map(|span| {
        SpanValidator::validate(span).err().map(|e| StructuralFinding {
            entity_kind: EntityKind::Span,
            entity_id: span.identity(),
            error: e.to_string(),
        })
    });
    let metrics = batch.metrics.iter().filter_map(|metric| {
        MetricValidator::validate(metric).err().map(|e| StructuralFinding {
            entity_kind: EntityKind::Metric,
            entity_id: metric.identity(),
            error: e.to_string(),
        })
    });
    spans.chain(metrics).collect()
}

/// Validate a batch file and print a JSON summary.
///
/// Returns `false` when structural validation fails, or when
/// `fail_on_violations` is set and the compliance report is non-empty.
pub async fn run(
    batch_path: &Path,
    config_path: Option<&Path>,
    fail_on_violations: bool,
) -> Result<bool, CheckError> {
    let config = super::load_config(config_path)?;

    let content = tokio::fs::read_to_string(batch_path)
        .await
        .map_err(|source| CheckError::ReadBatch {
            path: batch_path.to_path_buf(),
            source,
        })?;
    let batch: BatchFile =
        serde_json::from_str(&content).map_err(|source| CheckError::ParseBatch {
            path: batch_path.to_path_buf(),
            source,
        })?;

    let structural = structural_findings(&batch);
    info!(
        spans = batch.spans.len(),
        metrics = batch.metrics.len(),
        failures = structural.len(),
        "structural validation complete"
    );

    let validator = WeaverValidator::from_config(&config.weaver)?;
    let session = ValidationSession::from_config(&config);
    let compliance = validator
        .run_compliance_check(&session, &batch.spans, &batch.metrics)
        .await?;

    let summary = CheckSummary {
        structural: &structural,
        compliance: &compliance,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    let compliant = compliance.report().map_or(true, |r| r.is_compliant());
    Ok(structural.is_empty() && (compliant || !fail_on_violations))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::io::Write;

    use super::*;

    const BATCH: &str = r#"{
        "spans": [
            {
                "context": {"trace_id": "4bf92f3577b34da6a3ce929d0e0e4736", "span_id": "00f067aa0ba902b7"},
                "name": "GET /",
                "start_time_ms": 100,
                "end_time_ms": 90,
                "status": "ok"
            },
            {
                "context": {"trace_id": "4bf92f3577b34da6a3ce929d0e0e4736", "span_id": "00f067aa0ba902b8"},
                "name": "GET /health",
                "start_time_ms": 100,
                "end_time_ms": 110,
                "status": "ok"
            }
        ],
        "metrics": [
            {
                "name": "latency",
                "value": {"type": "histogram", "boundaries": [1.0, 2.0], "counts": [1, 2]},
                "timestamp_ms": 5
            }
        ]
    }"#;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn finds_structural_failures() {
        let batch: BatchFile = serde_json::from_str(BATCH).unwrap();
        let findings = structural_findings(&batch);

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].entity_kind, EntityKind::Span);
        assert_eq!(
            findings[0].entity_id,
            "4bf92f3577b34da6a3ce929d0e0e4736/00f067aa0ba902b7"
        );
        assert_eq!(findings[1].entity_id, "latency@5");
    }

    #[test]
    fn empty_batch_is_valid() {
        let batch: BatchFile = serde_json::from_str("{}").unwrap();
        assert!(structural_findings(&batch).is_empty());
    }

    #[tokio::test]
    async fn missing_tool_still_reports_structure() {
        let batch = write_temp(".json", BATCH);
        let config = write_temp(
            ".toml",
            r#"
            [weaver]
            binary = "meridian-definitely-missing-tool"
            "#,
        );

        let passed = run(batch.path(), Some(config.path()), true).await.unwrap();
        assert!(!passed);
    }

    #[tokio::test]
    async fn unreadable_batch_is_error() {
        let err = run(Path::new("/nonexistent/batch.json"), None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::ReadBatch { .. }));
    }
}
