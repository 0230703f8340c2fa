//! Semantic-convention rules and the in-memory registry.
//!
//! Rule files are TOML or JSON with a top-level `rules` array:
//!
//! ```toml
//! [[rules]]
//! key = "http.status_code"
//! kind = { type = "integer" }
//! required = true
//! applies_to = ["span"]
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::report::{
    EntityKind, REASON_NOT_BOOLEAN, REASON_NOT_INTEGER, REASON_NOT_IN_SET, REASON_NOT_NUMBER,
};

/// Value shape a convention expects for an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExpectedKind {
    /// Any string.
    String,
    /// Decimal integer.
    Integer,
    /// One of a fixed set of values.
    Enum {
        /// Allowed values.
        values: BTreeSet<String>,
    },
    /// No constraint on the value.
    Any,
    /// `true` or `false`.
    Boolean,
    /// Floating point number.
    Double,
}

impl ExpectedKind {
    /// Build an enum kind from a list of allowed values.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Check a recorded value, returning the violation reason on mismatch.
    pub fn check(&self, value: &str) -> Result<(), &'static str> {
        match self {
            Self::String | Self::Any => Ok(()),
            Self::Integer if is_integer(value) => Ok(()),
            Self::Integer => Err(REASON_NOT_INTEGER),
            Self::Enum { values } if values.contains(value) => Ok(()),
            Self::Enum { .. } => Err(REASON_NOT_IN_SET),
            Self::Boolean if matches!(value, "true" | "false") => Ok(()),
            Self::Boolean => Err(REASON_NOT_BOOLEAN),
            Self::Double => value
                .parse::<f64>()
                .map(drop)
                .map_err(|_| REASON_NOT_NUMBER),
        }
    }
}

/// Optional sign followed by decimal digits, of any magnitude.
fn is_integer(value: &str) -> bool {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// A single attribute convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConventionRule {
    /// Attribute key this rule governs.
    #[serde(rename = "key")]
    pub attribute_key: String,
    /// Expected value shape.
    #[serde(rename = "kind")]
    pub expected_kind: ExpectedKind,
    /// Whether the attribute must be present.
    #[serde(default)]
    pub required: bool,
    /// Entity kinds this rule applies to. Empty means all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applies_to: Vec<EntityKind>,
}

impl ConventionRule {
    pub fn new(attribute_key: impl Into<String>, expected_kind: ExpectedKind, required: bool) -> Self {
        Self {
            attribute_key: attribute_key.into(),
            expected_kind,
            required,
            applies_to: Vec::new(),
        }
    }

    /// Restrict the rule to the given entity kinds.
    #[must_use]
    pub fn for_kinds(mut self, kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        self.applies_to = kinds.into_iter().collect();
        self
    }

    /// Whether the rule governs entities of this kind.
    #[must_use]
    pub fn applies_to(&self, kind: EntityKind) -> bool {
        self.applies_to.is_empty() || self.applies_to.contains(&kind)
    }
}

/// On-disk rule listing.
#[derive(Debug, Default, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<ConventionRule>,
}

/// Rule file encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    Toml,
    Json,
}

impl RuleFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, RegistryError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            _ => Err(RegistryError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Immutable set of convention rules keyed by attribute.
#[derive(Debug, Clone, Default)]
pub struct ConventionRegistry {
    rules: IndexMap<String, ConventionRule>,
}

impl ConventionRegistry {
    /// Build a registry, rejecting empty and duplicate keys.
    pub fn from_rules(rules: impl IntoIterator<Item = ConventionRule>) -> Result<Self, RegistryError> {
        let mut map = IndexMap::new();
        for rule in rules {
            if rule.attribute_key.is_empty() {
                return Err(RegistryError::EmptyKey);
            }
            if map.contains_key(&rule.attribute_key) {
                return Err(RegistryError::DuplicateRule(rule.attribute_key));
            }
            map.insert(rule.attribute_key.clone(), rule);
        }
        Ok(Self { rules: map })
    }

    /// Parse a rule listing.
    ///
    /// `origin` names the file or command in error messages.
    pub fn parse(content: &str, format: RuleFormat, origin: &str) -> Result<Self, RegistryError> {
        let parse_err = |message: String| RegistryError::Parse {
            origin: origin.to_owned(),
            message,
        };
        let file: RuleFile = match format {
            RuleFormat::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string()))?,
            RuleFormat::Json => {
                serde_json::from_str(content).map_err(|e| parse_err(e.to_string()))?
            }
        };
        Self::from_rules(file.rules)
    }

    /// Look up the rule for an attribute key.
    #[must_use]
    pub fn lookup(&self, attribute_key: &str) -> Option<&ConventionRule> {
        self.rules.get(attribute_key)
    }

    /// All rules in load order.
    pub fn rules(&self) -> impl Iterator<Item = &ConventionRule> {
        self.rules.values()
    }

    /// Required rules applying to the given entity kind, in load order.
    pub fn required_for(&self, kind: EntityKind) -> impl Iterator<Item = &ConventionRule> {
        self.rules
            .values()
            .filter(move |rule| rule.required && rule.applies_to(kind))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Where a session loads its rules from.
#[derive(Debug, Clone)]
pub enum RegistrySource {
    /// TOML or JSON file, chosen by extension.
    File(PathBuf),
    /// External command printing a JSON listing on stdout.
    Command {
        program: String,
        args: Vec<String>,
    },
    /// Rules supplied directly.
    Rules(Vec<ConventionRule>),
}

impl From<crate::config::RegistryConfig> for RegistrySource {
    fn from(config: crate::config::RegistryConfig) -> Self {
        match config {
            crate::config::RegistryConfig::File { path } => Self::File(path),
            crate::config::RegistryConfig::Command { program, args } => {
                Self::Command { program, args }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::integer(ExpectedKind::Integer, "200", true)]
    #[case::negative_integer(ExpectedKind::Integer, "-3", true)]
    #[case::not_integer(ExpectedKind::Integer, "ok", false)]
    #[case::float_is_not_integer(ExpectedKind::Integer, "2.5", false)]
    #[case::above_i64(ExpectedKind::Integer, "18446744073709551615", true)]
    #[case::beyond_u64(ExpectedKind::Integer, "-99999999999999999999999", true)]
    #[case::bare_sign(ExpectedKind::Integer, "-", false)]
    #[case::empty_integer(ExpectedKind::Integer, "", false)]
    #[case::inner_space(ExpectedKind::Integer, "1 2", false)]
    #[case::boolean(ExpectedKind::Boolean, "true", true)]
    #[case::not_boolean(ExpectedKind::Boolean, "yes", false)]
    #[case::double(ExpectedKind::Double, "0.25", true)]
    #[case::not_double(ExpectedKind::Double, "fast", false)]
    #[case::string(ExpectedKind::String, "", true)]
    #[case::any(ExpectedKind::Any, "whatever", true)]
    fn kind_checks(#[case] kind: ExpectedKind, #[case] value: &str, #[case] ok: bool) {
        assert_eq!(kind.check(value).is_ok(), ok);
    }

    #[test]
    fn enum_reports_not_in_set() {
        let kind = ExpectedKind::one_of(["GET", "POST"]);
        assert!(kind.check("GET").is_ok());
        assert_eq!(kind.check("PATCH"), Err(REASON_NOT_IN_SET));
    }

    #[test]
    fn lookup_by_key() {
        let registry = ConventionRegistry::from_rules([
            ConventionRule::new("http.method", ExpectedKind::String, false),
            ConventionRule::new("http.status_code", ExpectedKind::Integer, true),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.lookup("http.status_code").map(|r| &r.expected_kind),
            Some(&ExpectedKind::Integer)
        );
        assert!(registry.lookup("db.system").is_none());
    }

    #[test]
    fn duplicate_keys_rejected() {
        let err = ConventionRegistry::from_rules([
            ConventionRule::new("http.method", ExpectedKind::String, false),
            ConventionRule::new("http.method", ExpectedKind::Any, true),
        ])
        .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRule(key) if key == "http.method"));
    }

    #[test]
    fn empty_key_rejected() {
        let err = ConventionRegistry::from_rules([ConventionRule::new("", ExpectedKind::Any, false)])
            .unwrap_err();
        assert!(matches!(err, RegistryError::EmptyKey));
    }

    #[test]
    fn required_for_respects_applies_to() {
        let registry = ConventionRegistry::from_rules([
            ConventionRule::new("http.status_code", ExpectedKind::Integer, true)
                .for_kinds([EntityKind::Span]),
            ConventionRule::new("service.name", ExpectedKind::String, true),
            ConventionRule::new("http.method", ExpectedKind::String, false),
        ])
        .unwrap();

        let span_keys: Vec<_> = registry
            .required_for(EntityKind::Span)
            .map(|r| r.attribute_key.as_str())
            .collect();
        let metric_keys: Vec<_> = registry
            .required_for(EntityKind::Metric)
            .map(|r| r.attribute_key.as_str())
            .collect();

        assert_eq!(span_keys, ["http.status_code", "service.name"]);
        assert_eq!(metric_keys, ["service.name"]);
    }

    #[test]
    fn parse_toml_listing() {
        let content = r#"
            [[rules]]
            key = "http.method"
            kind = { type = "enum", values = ["GET", "POST"] }

            [[rules]]
            key = "http.status_code"
            kind = { type = "integer" }
            required = true
            applies_to = ["span"]
        "#;

        let registry = ConventionRegistry::parse(content, RuleFormat::Toml, "rules.toml").unwrap();
        let status = registry.lookup("http.status_code").unwrap();
        assert!(status.required);
        assert_eq!(status.applies_to, vec![EntityKind::Span]);
        assert!(!registry.lookup("http.method").unwrap().required);
    }

    #[test]
    fn parse_json_listing() {
        let content = r#"{"rules": [{"key": "db.system", "kind": {"type": "any"}, "required": true}]}"#;
        let registry = ConventionRegistry::parse(content, RuleFormat::Json, "cmd").unwrap();
        assert!(registry.lookup("db.system").unwrap().required);
    }

    #[test]
    fn parse_error_names_origin() {
        let err = ConventionRegistry::parse("rules = 3", RuleFormat::Toml, "broken.toml").unwrap_err();
        assert!(matches!(err, RegistryError::Parse { origin, .. } if origin == "broken.toml"));
    }

    #[rstest]
    #[case("rules.toml", Some(RuleFormat::Toml))]
    #[case("rules.json", Some(RuleFormat::Json))]
    #[case("rules.yaml", None)]
    #[case("rules", None)]
    fn format_from_extension(#[case] path: &str, #[case] expected: Option<RuleFormat>) {
        assert_eq!(RuleFormat::from_path(Path::new(path)).ok(), expected);
    }
}
