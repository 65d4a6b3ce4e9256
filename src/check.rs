//! One-shot analysis (`resonnet check`).
//!
//! Reads a whole prompt from a file or stdin, analyzes it once without any
//! debouncing, and prints the findings.

use anyhow::{Context, Result};
use resonnet_core::models::Finding;
use resonnet_core::parse::parse_findings;
use std::fmt::Write as _;
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::client::AnalyzeClient;
use crate::config::Config;

/// Analyze `content` with a single client call.
///
/// Content shorter than `min_content_length` trimmed UTF-16 units yields no
/// findings and makes no call.
pub async fn analyze_once(
    client: &dyn AnalyzeClient,
    content: &str,
    min_content_length: usize,
) -> Result<Vec<Finding>> {
    if resonnet_core::trimmed_len(content) < min_content_length {
        return Ok(Vec::new());
    }
    let issues = client
        .analyze(content)
        .await
        .context("analysis request failed")?;
    Ok(parse_findings(content, &issues))
}

pub async fn run_check(
    cfg: &Config,
    client: &dyn AnalyzeClient,
    path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let content = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read prompt from stdin")?;
            buf
        }
    };

    let findings = analyze_once(client, &content, cfg.analysis.min_content_length).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&findings)?);
    } else {
        print!("{}", render_findings(&content, &findings));
    }
    Ok(())
}

/// Human-readable listing of `findings` against `content`.
pub fn render_findings(content: &str, findings: &[Finding]) -> String {
    let mut out = String::new();
    if findings.is_empty() {
        out.push_str("No issues found.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{} issue{} found:",
        findings.len(),
        if findings.len() == 1 { "" } else { "s" }
    );
    for f in findings {
        let line = line_of(content, f.start);
        let _ = writeln!(
            out,
            "\n  [{}] line {}, chars {}..{}: \"{}\"",
            f.kind, line, f.start, f.end, f.text
        );
        if !f.extra_spans.is_empty() {
            let _ = writeln!(out, "      also at {} more location(s)", f.extra_spans.len());
        }
        let _ = writeln!(out, "      suggestion: {}", f.suggestion);
        let _ = writeln!(out, "      {}", f.explanation);
    }
    out
}

/// 1-based line number of the character at `char_offset`.
fn line_of(content: &str, char_offset: usize) -> usize {
    content
        .chars()
        .take(char_offset)
        .filter(|&c| c == '\n')
        .count()
        + 1
}
