//! Renders a finished run into the status message.
//!
//! Everything here is pure: the same outcome and metadata always produce
//! the same text.

use crate::job::{RunOutcome, RunReport};
use crate::model::{SheetKind, SheetTally};
use chrono::{DateTime, FixedOffset};
use std::fmt::Write;

/// Warnings listed individually before the rest are summarized.
const MAX_LISTED_WARNINGS: usize = 15;
const MAX_LISTED_FAILURES: usize = 10;

/// Context about the invocation, shown alongside the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMeta {
    pub check_name: String,
    pub started_at: DateTime<FixedOffset>,
    pub elapsed_secs: u64,
    pub repository: Option<String>,
    pub run_number: Option<String>,
    pub logs_url: Option<String>,
}

impl RunMeta {
    pub fn new(check_name: impl Into<String>, started_at: DateTime<FixedOffset>) -> Self {
        Self {
            check_name: check_name.into(),
            started_at,
            elapsed_secs: 0,
            repository: None,
            run_number: None,
            logs_url: None,
        }
    }

    /// Fills CI details from `GITHUB_*` style variables.
    pub fn with_ci_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        self.repository = lookup("GITHUB_REPOSITORY");
        self.run_number = lookup("GITHUB_RUN_NUMBER");
        if let (Some(server), Some(repo), Some(run_id)) = (
            lookup("GITHUB_SERVER_URL"),
            lookup("GITHUB_REPOSITORY"),
            lookup("GITHUB_RUN_ID"),
        ) {
            self.logs_url = Some(format!("{}/{}/actions/runs/{}", server, repo, run_id));
        }
        self
    }
}

fn push_line(out: &mut String, line: impl AsRef<str>) {
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(line.as_ref());
}

fn push_meta_header(out: &mut String, meta: &RunMeta) {
    push_line(out, format!("• Check: {}", meta.check_name));
    push_line(
        out,
        format!("• When: {}", meta.started_at.format("%-I:%M%p %:z")),
    );
}

fn push_meta_footer(out: &mut String, meta: &RunMeta) {
    push_line(
        out,
        format!(
            "• Repo: {}",
            meta.repository.as_deref().unwrap_or("local run")
        ),
    );
    push_line(
        out,
        format!("• Run: #{}", meta.run_number.as_deref().unwrap_or("local")),
    );
    push_line(
        out,
        format!("• Logs: {}", meta.logs_url.as_deref().unwrap_or("(local)")),
    );
}

fn tally_line(sheet: SheetKind, tally: &SheetTally, unresolved: bool) -> String {
    let mut line = format!(
        "• {}: {} set TRUE, {} set FALSE, {} unchanged",
        sheet, tally.set_true, tally.set_false, tally.unchanged
    );
    if tally.skipped > 0 {
        let _ = write!(line, ", {} skipped", tally.skipped);
    }
    if unresolved {
        let _ = write!(line, ", {} not written (no date column)", tally.blocked);
    }
    line
}

fn format_report(out: &mut String, report: &RunReport, meta: &RunMeta) {
    let rec = &report.reconciliation;
    let dry_run = report.mode.is_dry_run();
    let troubled = report.apply.failed() > 0 || !rec.warnings.is_empty();

    let title = match (dry_run, troubled) {
        (true, _) => format!("🧪 Roll call rehearsal for {} (dry run, nothing written)", rec.date),
        (false, false) => format!("✅ Roll call completed for {}", rec.date),
        (false, true) => format!("⚠️ Roll call completed with warnings for {}", rec.date),
    };
    push_line(out, title);
    push_meta_header(out, meta);

    let individuals_unresolved = rec.column_unresolved(SheetKind::Individuals);
    push_line(
        out,
        format!(
            "• Today marked: {}{}",
            report.marked_today(),
            if individuals_unresolved { " (not written)" } else { "" }
        ),
    );
    push_line(
        out,
        format!(
            "• Yesterday marked: {}",
            rec.yesterday_marked
                .map(|n| n.to_string())
                .unwrap_or_else(|| "N/A".to_string())
        ),
    );
    push_line(
        out,
        format!(
            "• Reactors found: {} ({} mapped, {} unmapped)",
            rec.reactions.total, rec.reactions.matched, rec.reactions.unmapped
        ),
    );
    push_line(
        out,
        tally_line(SheetKind::Individuals, &rec.individuals, individuals_unresolved),
    );
    push_line(
        out,
        tally_line(
            SheetKind::Groups,
            &rec.groups,
            rec.column_unresolved(SheetKind::Groups),
        ),
    );

    let verb = if dry_run { "simulated" } else { "written" };
    push_line(
        out,
        format!(
            "• Cells {}: {}/{}",
            verb,
            report.apply.succeeded(),
            report.apply.attempted()
        ),
    );

    let failed = report.apply.failed();
    if failed > 0 {
        push_line(out, format!("• Write failures: {}", failed));
        for result in report.apply.failures().take(MAX_LISTED_FAILURES) {
            if let crate::apply::WriteStatus::WriteFailed(reason) = &result.status {
                push_line(out, format!("  - {}: {}", result.write, reason));
            }
        }
        if failed > MAX_LISTED_FAILURES {
            push_line(out, format!("  - … and {} more", failed - MAX_LISTED_FAILURES));
        }
    }

    if !rec.warnings.is_empty() {
        push_line(out, format!("• Warnings: {}", rec.warnings.len()));
        for warning in rec.warnings.iter().take(MAX_LISTED_WARNINGS) {
            push_line(out, format!("  - {}", warning));
        }
        if rec.warnings.len() > MAX_LISTED_WARNINGS {
            push_line(
                out,
                format!("  - … and {} more", rec.warnings.len() - MAX_LISTED_WARNINGS),
            );
        }
    }

    push_line(out, format!("• Took: {}s", meta.elapsed_secs));
    push_meta_footer(out, meta);
}

/// Message text for a run outcome.
pub fn format_summary(outcome: &RunOutcome, meta: &RunMeta) -> String {
    let mut out = String::new();
    match outcome {
        RunOutcome::Completed(report) => format_report(&mut out, report, meta),
        RunOutcome::Failed { reason } => {
            push_line(&mut out, "❌ Roll call failed");
            push_meta_header(&mut out, meta);
            push_line(&mut out, format!("• Reason: {}", reason));
            push_line(&mut out, format!("• Took: {}s", meta.elapsed_secs));
            push_meta_footer(&mut out, meta);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ci_env_builds_logs_url() {
        let started = DateTime::parse_from_rfc3339("2026-01-01T06:05:00-08:00").unwrap();
        let meta = RunMeta::new("Morning", started).with_ci_env(|k| match k {
            "GITHUB_SERVER_URL" => Some("https://github.com".to_string()),
            "GITHUB_REPOSITORY" => Some("reading/club".to_string()),
            "GITHUB_RUN_ID" => Some("42".to_string()),
            "GITHUB_RUN_NUMBER" => Some("7".to_string()),
            _ => None,
        });
        assert_eq!(
            meta.logs_url.as_deref(),
            Some("https://github.com/reading/club/actions/runs/42")
        );
        assert_eq!(meta.run_number.as_deref(), Some("7"));
    }

    #[test]
    fn local_run_has_no_ci_details() {
        let started = DateTime::parse_from_rfc3339("2026-01-01T06:05:00-08:00").unwrap();
        let meta = RunMeta::new("Morning", started).with_ci_env(|_| None);
        assert!(meta.repository.is_none());
        assert!(meta.logs_url.is_none());
    }
}
