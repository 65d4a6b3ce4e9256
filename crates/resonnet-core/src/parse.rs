//! Conversion of raw analysis issues into located findings.
//!
//! Offsets are character (Unicode scalar) positions. An issue whose text does
//! not occur in the content is anchored as the empty span `[0, 0)`.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::models::{Finding, FindingKind, RawIssue, Span};

/// Map a remote category label to the UI finding type.
pub fn map_category(category: &str) -> FindingKind {
    match category {
        "CAPABILITY_ASSUMPTION" => FindingKind::Assumption,
        "AMBIGUOUS_INSTRUCTION" | "CONFLICTING_DIRECTIVES" => FindingKind::Ambiguity,
        "UNDERSPECIFIED_PARAMETERS" => FindingKind::Technical,
        _ => FindingKind::Ambiguity,
    }
}

/// Generic explanation text for a finding type.
pub fn explanation_for(kind: FindingKind) -> String {
    format!(
        "This {} issue might cause misalignment between your intent and the LLM's interpretation.",
        kind
    )
}

/// Locate each raw issue in `content` and build the finding list.
///
/// ```rust
/// use resonnet_core::models::{FindingKind, RawIssue};
/// use resonnet_core::parse::parse_findings;
///
/// let issues = [RawIssue::new("vague", "AMBIGUOUS_INSTRUCTION", "S")];
/// let findings = parse_findings("this is vague wording", &issues);
/// assert_eq!((findings[0].start, findings[0].end), (8, 13));
/// assert_eq!(findings[0].kind, FindingKind::Ambiguity);
/// ```
pub fn parse_findings(content: &str, issues: &[RawIssue]) -> Vec<Finding> {
    issues
        .iter()
        .map(|issue| {
            let kind = map_category(&issue.category);
            let mut spans = locate(content, &issue.text).into_iter();
            let first = spans.next().unwrap_or(Span { start: 0, end: 0 });
            Finding {
                start: first.start,
                end: first.end,
                kind,
                text: issue.text.clone(),
                suggestion: issue.suggestion.clone(),
                explanation: explanation_for(kind),
                extra_spans: spans.collect(),
            }
        })
        .collect()
}

/// Every non-overlapping occurrence of `needle` in `haystack`, as char spans.
///
/// An empty needle matches once at position 0.
fn locate(haystack: &str, needle: &str) -> Vec<Span> {
    if needle.is_empty() {
        return vec![Span { start: 0, end: 0 }];
    }
    let width = needle.chars().count();
    let mut spans = Vec::new();
    // Walk matches in order, converting byte offsets incrementally.
    let mut last_byte = 0;
    let mut last_char = 0;
    for (byte, _) in haystack.match_indices(needle) {
        last_char += haystack[last_byte..byte].chars().count();
        last_byte = byte;
        spans.push(Span {
            start: last_char,
            end: last_char + width,
        });
    }
    spans
}

/// Decode the model's reply text into raw issues.
///
/// Malformed JSON is an error. Valid JSON that is not an array yields an
/// empty list, and array elements that are not issue objects are skipped.
pub fn decode_issues(payload: &str) -> Result<Vec<RawIssue>> {
    let value: Value =
        serde_json::from_str(payload.trim()).context("analysis payload is not valid JSON")?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value::<RawIssue>(item).ok())
        .collect())
}
