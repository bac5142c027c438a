//! Text (terminal) reporter with colors and formatting

use crate::models::{RepoStatus, RunLogEntry};
use crate::pipeline::RunSummary;
use anyhow::Result;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

fn status_color(status: &RepoStatus) -> &'static str {
    match status {
        RepoStatus::Complete => GREEN,
        RepoStatus::Partial(_) => YELLOW,
        RepoStatus::Failed(_) => RED,
    }
}

fn status_tag(status: &RepoStatus) -> &'static str {
    match status {
        RepoStatus::Complete => "[OK]",
        RepoStatus::Partial(_) => "[PT]",
        RepoStatus::Failed(_) => "[FL]",
    }
}

/// Render the run summary as formatted terminal output.
pub fn render(log: &[RunLogEntry], summary: &RunSummary) -> Result<String> {
    let mut out = String::new();

    out.push_str(&format!("\n{BOLD}Lazarus Mining Run{RESET}\n"));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
    out.push_str(&format!(
        "Repos: {BOLD}{}{RESET}  With commits: {}  With cycles: {}\n",
        summary.total, summary.with_commits, summary.with_cycles
    ));
    out.push_str(&format!(
        "Dead: {RED}{}{RESET}  Resurrected: {GREEN}{}{RESET}  Died again: {YELLOW}{}{RESET}\n",
        summary.dead, summary.resurrected, summary.died_again
    ));
    out.push_str(&format!(
        "Resurrection rate: {BOLD}{:.1}%{RESET}  Cycle yield: {BOLD}{:.1}%{RESET}\n\n",
        summary.resurrection_rate() * 100.0,
        summary.yield_rate() * 100.0
    ));

    out.push_str(&format!(
        "{BOLD}STATUS{RESET}  {GREEN}{} complete{RESET} | {YELLOW}{} partial{RESET} | {RED}{} failed{RESET}\n",
        summary.complete, summary.partial, summary.failed
    ));

    if !log.is_empty() {
        out.push_str(&format!(
            "\n{DIM}       REPO                                 COMMITS  CYCLES  RESOLVED{RESET}\n"
        ));
        out.push_str(&format!(
            "{DIM}  ─────────────────────────────────────────────────────────────────{RESET}\n"
        ));
        for entry in log {
            let color = status_color(&entry.status);
            let tag = status_tag(&entry.status);
            // Truncate the repo name on char boundaries
            let repo: String = entry.repo.chars().take(35).collect();
            out.push_str(&format!(
                "  {color}{tag}{RESET} {:<36} {:>7} {:>7} {:>9}\n",
                repo, entry.commits_collected, entry.cycles_detected, entry.cycles_resolved
            ));
            for err in &entry.errors {
                out.push_str(&format!("       {DIM}{err}{RESET}\n"));
            }
        }
    }

    out.push('\n');
    Ok(out)
}
