use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::orchestration::OrchestrationRun;
use crate::synthesis::{render_proposal_md, RevisionProposal};

/// Read and parse a JSON artifact (lesson, run, proposal, decisions).
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

/// Write any artifact as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, artifact: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(artifact).context("serialize artifact")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

pub fn write_proposal_md(path: &Path, proposal: &RevisionProposal) -> Result<()> {
    std::fs::write(path, render_proposal_md(proposal))
        .with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render a per-profile summary of an orchestration run.
pub fn render_run_md(run: &OrchestrationRun) -> String {
    let mut out = String::new();
    out.push_str("# Panel Review\n\n");
    out.push_str(&format!("- Run: `{}`\n", run.run_id));
    out.push_str(&format!("- Lesson digest: `{}`\n", run.lesson_digest));
    if run.cancelled {
        out.push_str("- Status: cancelled\n");
    } else if !run.is_complete() {
        out.push_str("- Status: partial\n");
    }
    out.push('\n');

    out.push_str("| Profile | Rating | High | Medium | Low | Incomplete |\n");
    out.push_str("|---|---:|---:|---:|---:|---:|\n");
    for r in &run.reports {
        out.push_str(&format!(
            "| {} | {}/5 | {} | {} | {} | {} |\n",
            r.display_name,
            r.rating,
            r.count(crate::domain::Severity::High),
            r.count(crate::domain::Severity::Medium),
            r.count(crate::domain::Severity::Low),
            r.incomplete.len()
        ));
    }

    if !run.skipped.is_empty() {
        out.push_str("\n## Skipped\n");
        for s in &run.skipped {
            let who = s
                .profile_id
                .as_deref()
                .or(s.source.as_deref())
                .unwrap_or("unknown");
            out.push_str(&format!("- {}: {}\n", who, s.reason));
        }
    }

    let incomplete: Vec<_> = run.incomplete().collect();
    if !incomplete.is_empty() {
        out.push_str("\n## Incomplete Criteria\n");
        for (profile, i) in incomplete {
            out.push_str(&format!("- {} / {}: {}\n", profile, i.criterion, i.reason));
        }
    }
    out
}
