//! Local rule matching of recorded attributes against a registry.
//!
//! Only known-but-malformed and missing-required attributes are flagged.
//! Keys with no rule are accepted whatever their value.

use std::collections::HashMap;

use meridian_trace::{Attributes, Metric, Span};

use crate::registry::ConventionRegistry;
use crate::report::{ComplianceReport, EntityKind, Violation, REASON_MISSING_REQUIRED};

/// Match every span and metric against the registry.
#[must_use]
pub fn evaluate(registry: &ConventionRegistry, spans: &[Span], metrics: &[Metric]) -> ComplianceReport {
    let checked = spans.len().saturating_add(metrics.len());
    let mut report = ComplianceReport::new(u32::try_from(checked).unwrap_or(u32::MAX));
    let mut ids = EntityIds::default();
    let mut violations = Vec::new();

    for span in spans {
        let entity = Entity {
            kind: EntityKind::Span,
            name: span.name(),
            id: ids.assign(EntityKind::Span, span.identity()),
        };
        violations.extend(entity.check(registry, span.attributes()));
    }
    for metric in metrics {
        let entity = Entity {
            kind: EntityKind::Metric,
            name: metric.name(),
            id: ids.assign(EntityKind::Metric, metric.identity()),
        };
        violations.extend(entity.check(registry, metric.attributes()));
    }

    report.extend(violations);
    report
}

/// Hands out batch-unique entity ids.
///
/// The n-th repeat of an identity gets a `~n` suffix, so indistinguishable
/// entities still keep one violation each.
#[derive(Debug, Default)]
struct EntityIds {
    seen: HashMap<(EntityKind, String), usize>,
}

impl EntityIds {
    fn assign(&mut self, kind: EntityKind, identity: String) -> String {
        let count = self.seen.entry((kind, identity.clone())).or_insert(0);
        *count += 1;
        if *count == 1 {
            identity
        } else {
            format!("{identity}~{count}")
        }
    }
}

struct Entity<'a> {
    kind: EntityKind,
    name: &'a str,
    id: String,
}

impl Entity<'_> {
    fn check(&self, registry: &ConventionRegistry, attributes: &Attributes) -> Vec<Violation> {
        let malformed = attributes.iter().filter_map(|(key, value)| {
            let rule = registry.lookup(key).filter(|rule| rule.applies_to(self.kind))?;
            rule.expected_kind
                .check(value)
                .err()
                .map(|reason| self.violation(Some(key), reason))
        });

        let missing = registry
            .required_for(self.kind)
            .filter(|rule| !attributes.contains_key(&rule.attribute_key))
            .map(|rule| self.violation(Some(&rule.attribute_key), REASON_MISSING_REQUIRED));

        malformed.chain(missing).collect()
    }

    fn violation(&self, attribute_key: Option<&str>, reason: &str) -> Violation {
        Violation {
            entity_kind: self.kind,
            entity_name: self.name.to_owned(),
            entity_id: self.id.clone(),
            attribute_key: attribute_key.map(str::to_owned),
            reason: reason.to_owned(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use meridian_trace::{MetricValue, SpanContext, SpanId, SpanStatus, TraceId};

    use super::*;
    use crate::registry::{ConventionRule, ExpectedKind};
    use crate::report::{REASON_NOT_INTEGER, REASON_NOT_IN_SET};

    fn span(id: u64, attributes: &[(&str, &str)]) -> Span {
        let context = SpanContext::new(TraceId::from_u128(1), SpanId::from_u64(id), None, 1);
        let attributes = attributes
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        let mut span =
            Span::new_active(context, "op", 0, attributes, Vec::new(), SpanStatus::Ok).unwrap();
        span.complete(1).unwrap();
        span
    }

    fn registry() -> ConventionRegistry {
        ConventionRegistry::from_rules([
            ConventionRule::new("http.status_code", ExpectedKind::Integer, true)
                .for_kinds([EntityKind::Span]),
            ConventionRule::new(
                "http.method",
                ExpectedKind::one_of(["GET", "POST", "PUT", "DELETE"]),
                false,
            ),
        ])
        .unwrap()
    }

    #[test]
    fn compliant_span_has_no_violations() {
        let report = evaluate(
            &registry(),
            &[span(1, &[("http.status_code", "200"), ("http.method", "GET")])],
            &[],
        );
        assert_eq!(report.checked_count, 1);
        assert!(report.is_compliant());
    }

    #[test]
    fn malformed_and_missing_are_both_reported() {
        let report = evaluate(&registry(), &[span(7, &[("http.method", "PATCH")])], &[]);

        let reasons: Vec<_> = report.violations.iter().map(|v| v.reason.as_str()).collect();
        assert_eq!(reasons, [REASON_NOT_IN_SET, REASON_MISSING_REQUIRED]);
        assert!(report
            .violations
            .iter()
            .all(|v| v.entity_id.ends_with(&SpanId::from_u64(7).to_hex())));
    }

    #[test]
    fn integer_rule_rejects_text() {
        let report = evaluate(&registry(), &[span(1, &[("http.status_code", "OK")])], &[]);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].reason, REASON_NOT_INTEGER);
    }

    #[test]
    fn span_only_rule_skips_metrics() {
        let metric = Metric::new(
            "requests",
            MetricValue::counter(3),
            10,
            [("http.status_code".to_owned(), "teapot".to_owned())]
                .into_iter()
                .collect(),
        );
        let report = evaluate(&registry(), &[], &[metric]);
        assert_eq!(report.checked_count, 1);
        assert!(report.is_compliant());
    }

    #[test]
    fn metric_violations_use_identity() {
        let registry = ConventionRegistry::from_rules([ConventionRule::new(
            "service.name",
            ExpectedKind::String,
            true,
        )])
        .unwrap();
        let metric = Metric::new("requests", MetricValue::counter(1), 42, Attributes::new());

        let report = evaluate(&registry, &[], &[metric]);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].entity_kind, EntityKind::Metric);
        assert_eq!(report.violations[0].entity_id, "requests@42");
    }

    #[test]
    fn same_millisecond_series_keep_their_own_violations() {
        let registry = ConventionRegistry::from_rules([ConventionRule::new(
            "service.name",
            ExpectedKind::String,
            true,
        )])
        .unwrap();
        let route = |path: &str| -> Attributes {
            [("http.route".to_owned(), path.to_owned())].into_iter().collect()
        };
        let metrics = [
            Metric::new("http.requests", MetricValue::counter(1), 1_000, route("/a")),
            Metric::new("http.requests", MetricValue::counter(1), 1_000, route("/b")),
        ];

        let report = evaluate(&registry, &[], &metrics);
        assert_eq!(report.checked_count, 2);
        assert_eq!(report.violations.len(), 2);
    }

    #[test]
    fn identical_entities_get_suffixed_ids() {
        let registry = ConventionRegistry::from_rules([ConventionRule::new(
            "service.name",
            ExpectedKind::String,
            true,
        )])
        .unwrap();
        let metric = Metric::new("requests", MetricValue::counter(1), 3, Attributes::new());

        let report = evaluate(&registry, &[], &[metric.clone(), metric]);
        let ids: Vec<_> = report.violations.iter().map(|v| v.entity_id.as_str()).collect();
        assert_eq!(ids, ["requests@3", "requests@3~2"]);
    }

    #[test]
    fn equal_span_ids_in_different_traces_stay_apart() {
        let in_trace = |trace: u128| {
            let context = SpanContext::new(TraceId::from_u128(trace), SpanId::from_u64(1), None, 1);
            let mut span =
                Span::new_active(context, "op", 0, Attributes::new(), Vec::new(), SpanStatus::Ok)
                    .unwrap();
            span.complete(1).unwrap();
            span
        };

        let report = evaluate(&registry(), &[in_trace(1), in_trace(2)], &[]);
        assert_eq!(report.violations.len(), 2);
        assert_ne!(report.violations[0].entity_id, report.violations[1].entity_id);
    }
}
