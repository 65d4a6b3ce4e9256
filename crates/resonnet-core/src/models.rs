//! Data types shared between the scheduler, the parser, and the UI layer.
//!
//! A [`Finding`] is what the editor overlay renders; a [`RawIssue`] is what the
//! remote analysis service returns before it has been located in the content.

use serde::{Deserialize, Serialize};

/// UI category of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingKind {
    Assumption,
    Ambiguity,
    Technical,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::Assumption => "assumption",
            FindingKind::Ambiguity => "ambiguity",
            FindingKind::Technical => "technical",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open character range `[start, end)` over the analyzed content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// One detected issue, located against the content it was produced for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Character offset of the first occurrence of `text`.
    pub start: usize,
    /// One past the last character of the first occurrence.
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: FindingKind,
    /// The issue text as reported by the analysis service.
    pub text: String,
    pub suggestion: String,
    pub explanation: String,
    /// Later occurrences of `text` in the same content.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_spans: Vec<Span>,
}

/// An issue as returned by the analysis service.
///
/// Fields missing from the payload deserialize as empty strings so one
/// sloppy element does not discard the whole response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawIssue {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub suggestion: String,
}

impl RawIssue {
    pub fn new(
        text: impl Into<String>,
        category: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
            suggestion: suggestion.into(),
        }
    }
}

/// Coarse state of the request coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Debouncing,
    InFlight,
    InFlightQueued,
}

/// Reactive output consumed by the UI layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisView {
    pub findings: Vec<Finding>,
    pub is_analyzing: bool,
    pub error: Option<String>,
    pub phase: Phase,
    /// Debounce delay currently in effect.
    pub debounce_ms: u64,
}
