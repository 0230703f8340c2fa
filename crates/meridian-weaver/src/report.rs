//! Compliance report types and parsing of the tool's raw output.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Reason recorded when a required attribute is absent.
pub const REASON_MISSING_REQUIRED: &str = "missing required attribute";
/// Reason recorded when an enum-constrained value is outside its set.
pub const REASON_NOT_IN_SET: &str = "value not in allowed set";
/// Reason recorded when an integer-constrained value does not parse.
pub const REASON_NOT_INTEGER: &str = "value is not an integer";
/// Reason recorded when a boolean-constrained value does not parse.
pub const REASON_NOT_BOOLEAN: &str = "value is not a boolean";
/// Reason recorded when a double-constrained value does not parse.
pub const REASON_NOT_NUMBER: &str = "value is not a number";

/// Kind of telemetry entity a violation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Span,
    Metric,
}

/// One convention violation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
    pub entity_kind: EntityKind,
    pub entity_name: String,
    /// Batch-unique entity id: `trace_id/span_id` for spans,
    /// `name@timestamp{attributes}` for metrics, with a `~n` suffix on
    /// repeats.
    pub entity_id: String,
    /// Offending attribute, if the violation is attribute-specific.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_key: Option<String>,
    pub reason: String,
}

impl Violation {
    /// Identity used for deduplication.
    fn key(&self) -> ViolationKey {
        (
            self.entity_kind,
            self.entity_id.clone(),
            self.attribute_key.clone(),
            self.reason.clone(),
        )
    }
}

type ViolationKey = (EntityKind, String, Option<String>, String);

/// Result of a live check.
///
/// Violations are data; whether a non-empty report fails a build is the
/// caller's decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// Number of entities examined.
    pub checked_count: u32,
    /// Violations in first-seen order, without duplicates.
    pub violations: Vec<Violation>,
}

impl ComplianceReport {
    #[must_use]
    pub const fn new(checked_count: u32) -> Self {
        Self {
            checked_count,
            violations: Vec::new(),
        }
    }

    /// Append violations, skipping any already present.
    pub fn extend(&mut self, violations: impl IntoIterator<Item = Violation>) {
        let mut seen: HashSet<ViolationKey> = self.violations.iter().map(Violation::key).collect();
        self.violations
            .extend(violations.into_iter().filter(|v| seen.insert(v.key())));
    }

    #[must_use]
    pub fn is_compliant(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations for one entity.
    pub fn violations_for<'a>(&'a self, entity_id: &'a str) -> impl Iterator<Item = &'a Violation> {
        self.violations.iter().filter(move |v| v.entity_id == entity_id)
    }
}

/// Whether the semantic check actually ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ComplianceOutcome {
    /// The check ran and produced a report.
    Checked(ComplianceReport),
    /// The tool was unavailable; nothing was checked.
    Skipped {
        /// Why the check was skipped.
        reason: String,
    },
}

impl ComplianceOutcome {
    /// The report, if the check ran.
    #[must_use]
    pub const fn report(&self) -> Option<&ComplianceReport> {
        match self {
            Self::Checked(report) => Some(report),
            Self::Skipped { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

// ============================================================================
// Raw tool output
// ============================================================================

/// Unparsed stdout of a live-check invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawReport {
    pub body: String,
}

impl RawReport {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    /// Extract violation-level advice.
    ///
    /// Advice at `improvement` or `information` level is dropped. An empty
    /// body means the tool had nothing to say.
    pub fn violations(&self) -> Result<Vec<Violation>, ToolError> {
        if self.body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let output: ToolOutput = serde_json::from_str(&self.body)
            .map_err(|e| ToolError::MalformedOutput(e.to_string()))?;

        Ok(output
            .samples
            .into_iter()
            .flat_map(|sample| {
                let ToolSample {
                    entity,
                    attribute,
                    advice,
                } = sample;
                advice
                    .into_iter()
                    .filter(|a| a.level == AdviceLevel::Violation)
                    .map(move |a| Violation {
                        entity_kind: entity.kind,
                        entity_name: entity.name.clone(),
                        entity_id: entity.id.clone(),
                        attribute_key: attribute.clone(),
                        reason: a.message,
                    })
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct ToolOutput {
    #[serde(default)]
    samples: Vec<ToolSample>,
}

#[derive(Debug, Deserialize)]
struct ToolSample {
    entity: ToolEntity,
    #[serde(default)]
    attribute: Option<String>,
    #[serde(default)]
    advice: Vec<ToolAdvice>,
}

#[derive(Debug, Deserialize)]
struct ToolEntity {
    kind: EntityKind,
    name: String,
    id: String,
}

#[derive(Debug, Deserialize)]
struct ToolAdvice {
    level: AdviceLevel,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum AdviceLevel {
    Violation,
    Improvement,
    Information,
}
