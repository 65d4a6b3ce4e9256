//! Interactive editing session (`resonnet session`).
//!
//! Each input line is a full snapshot of the editor buffer (`\n` inside a
//! line stands for a newline). Snapshots are fed to the coordinator exactly
//! as an editor would on every keystroke, and each published
//! [`AnalysisView`](resonnet_core::models::AnalysisView) is written out as one
//! JSON line.

use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::client::AnalyzeClient;
use crate::config::Config;
use crate::coordinator::{Coordinator, CoordinatorSettings};

pub async fn run_session(cfg: &Config, client: Arc<dyn AnalyzeClient>) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let settings = CoordinatorSettings::from_config(cfg);
    let mut stdout = run_session_with(client, settings, stdin, std::io::stdout()).await?;
    stdout.flush()?;
    Ok(())
}

/// Drive a session from `input`, writing views to `output`.
///
/// Returns `output` once input is exhausted and all submitted snapshots have
/// settled.
pub async fn run_session_with<R, W>(
    client: Arc<dyn AnalyzeClient>,
    settings: CoordinatorSettings,
    input: R,
    mut output: W,
) -> Result<W>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send + 'static,
{
    let handle = Coordinator::spawn(client, settings);
    let mut views = handle.subscribe();

    let printer = tokio::spawn(async move {
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            serde_json::to_writer(&mut output, &view)?;
            writeln!(output)?;
        }
        Ok::<_, anyhow::Error>(output)
    });

    let mut lines = input.lines();
    let mut snapshots = 0usize;
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        handle.analyze_prompt(unescape(&line));
        snapshots += 1;
    }

    let settled = handle.wait_idle().await?;
    tracing::debug!(
        snapshots,
        findings = settled.findings.len(),
        "session input exhausted"
    );

    // Dropping the last handle stops the coordinator and closes the view channel.
    drop(handle);
    printer.await.context("session printer panicked")?
}

/// Expand `\n` and `\\` escapes in a snapshot line.
fn unescape(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
