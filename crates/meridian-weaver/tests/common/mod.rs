//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use meridian_trace::{Attributes, Span, SpanContext, SpanId, SpanStatus, TraceId};
use meridian_weaver::{RawReport, TelemetryBatch, ToolError, ToolRunner};
use semver::Version;

/// How the fake tool answers the availability check.
#[derive(Debug, Clone, Copy)]
pub enum VersionReply {
    Version(&'static str),
    Missing,
    Hang,
}

/// In-memory stand-in for the validation tool.
#[derive(Debug)]
pub struct FakeRunner {
    reply: VersionReply,
    report: String,
    check_delay: Option<Duration>,
    check_calls: AtomicUsize,
}

impl FakeRunner {
    pub fn available() -> Self {
        Self::answering(VersionReply::Version("0.16.1"))
    }

    pub fn answering(reply: VersionReply) -> Self {
        Self {
            reply,
            report: String::new(),
            check_delay: None,
            check_calls: AtomicUsize::new(0),
        }
    }

    pub fn reporting(mut self, report: impl Into<String>) -> Self {
        self.report = report.into();
        self
    }

    pub fn slow_check(mut self, delay: Duration) -> Self {
        self.check_delay = Some(delay);
        self
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolRunner for FakeRunner {
    async fn check_available(&self) -> Result<Version, ToolError> {
        match self.reply {
            VersionReply::Version(v) => Ok(Version::parse(v).unwrap()),
            VersionReply::Missing => Err(ToolError::NotFound {
                binary: "weaver".to_owned(),
            }),
            VersionReply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("version check should have timed out")
            }
        }
    }

    async fn check(&self, _batch: &TelemetryBatch<'_>) -> Result<RawReport, ToolError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.check_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(RawReport::new(self.report.clone()))
    }
}

/// Completed span with the given id and attributes.
pub fn completed_span(id: u64, name: &str, attributes: &[(&str, &str)]) -> Span {
    let context = SpanContext::new(
        TraceId::from_u128(0xfeed_0000_0000_0000_0000_0000_0000_0001),
        SpanId::from_u64(id),
        None,
        1,
    );
    let attributes: Attributes = attributes
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    let mut span = Span::new_active(context, name, 1_000, attributes, Vec::new(), SpanStatus::Ok)
        .unwrap();
    span.complete(1_050).unwrap();
    span
}
