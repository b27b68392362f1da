// File: tests/summary_format.rs
use chrono::{DateTime, NaiveDate};
use rollcall::client::{MemoryStore, StaticSource};
use rollcall::config::Config;
use rollcall::job::{self, RunOutcome};
use rollcall::model::Grid;
use rollcall::summary::{RunMeta, format_summary};

fn meta() -> RunMeta {
    let started = DateTime::parse_from_rfc3339("2026-01-01T06:05:00-08:00").unwrap();
    let mut meta = RunMeta::new("Morning Check", started);
    meta.elapsed_secs = 3;
    meta
}

fn store(individual_header: &str) -> MemoryStore {
    MemoryStore::new()
        .with_sheet(
            "Individuals",
            Grid::from_rows([
                vec!["Name", "12/31/2025", individual_header],
                vec!["Alice", "TRUE", ""],
                vec!["Bob", "", ""],
            ]),
        )
        .with_sheet(
            "Groups",
            Grid::from_rows([
                vec!["Group", "Roster", "1/1/2026"],
                vec!["Pair", "Alice, Bob", ""],
            ]),
        )
        .with_sheet(
            "Member Mapping",
            Grid::from_rows([vec!["User ID", "Label"], vec!["u1", "Alice"]]),
        )
}

async fn outcome(config: &Config, store: &MemoryStore, ids: &[&str]) -> RunOutcome {
    let source = StaticSource::reactors(ids.iter().copied());
    let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    job::execute(config, today, &source, store).await.unwrap()
}

#[tokio::test]
async fn test_clean_run_summary() {
    let outcome = outcome(&Config::default(), &store("1/1/2026"), &["u1"]).await;
    let text = format_summary(&outcome, &meta());
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "✅ Roll call completed for 2026-01-01");
    assert!(lines.contains(&"• Check: Morning Check"));
    assert!(lines.contains(&"• When: 6:05AM -08:00"));
    assert!(lines.contains(&"• Today marked: 1"));
    assert!(lines.contains(&"• Yesterday marked: 1"));
    assert!(lines.contains(&"• Reactors found: 1 (1 mapped, 0 unmapped)"));
    assert!(lines.contains(&"• Individuals: 1 set TRUE, 1 set FALSE, 0 unchanged"));
    assert!(lines.contains(&"• Groups: 0 set TRUE, 1 set FALSE, 0 unchanged"));
    assert!(lines.contains(&"• Cells written: 3/3"));
    assert!(lines.contains(&"• Took: 3s"));
    assert!(lines.contains(&"• Repo: local run"));
    assert!(!text.contains("Warnings"));
}

#[tokio::test]
async fn test_warnings_change_the_title_and_are_listed() {
    let outcome = outcome(&Config::default(), &store("1/1/2026"), &["u1", "ghost"]).await;
    let text = format_summary(&outcome, &meta());

    assert!(text.starts_with("⚠️ Roll call completed with warnings for 2026-01-01"));
    assert!(text.contains("• Warnings: 1"));
    assert!(text.contains("  - reacting user ghost has no member mapping"));
}

#[tokio::test]
async fn test_dry_run_title_and_counts() {
    let mut config = Config::default();
    config.dry_run = true;
    let outcome = outcome(&config, &store("1/1/2026"), &["u1"]).await;
    let text = format_summary(&outcome, &meta());

    assert!(text.starts_with("🧪 Roll call rehearsal for 2026-01-01 (dry run, nothing written)"));
    assert!(text.contains("• Cells simulated: 3/3"));
}

#[tokio::test]
async fn test_unresolved_column_is_called_out() {
    let outcome = outcome(&Config::default(), &store("Notes"), &["u1"]).await;
    let text = format_summary(&outcome, &meta());

    assert!(text.contains("• Today marked: 1 (not written)"));
    assert!(text.contains("2 not written (no date column)"));
    assert!(text.contains("no date column found for 2026-01-01 in header row 1"));
}

#[tokio::test]
async fn test_formatting_is_deterministic() {
    let a = outcome(&Config::default(), &store("1/1/2026"), &["u1", "x", "y"]).await;
    let b = outcome(&Config::default(), &store("1/1/2026"), &["y", "x", "u1"]).await;
    assert_eq!(format_summary(&a, &meta()), format_summary(&b, &meta()));
}

#[test]
fn test_failure_summary() {
    let outcome = RunOutcome::Failed {
        reason: "Could not find today's post in <#100>".into(),
    };
    let text = format_summary(&outcome, &meta());
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "❌ Roll call failed");
    assert!(lines.contains(&"• Reason: Could not find today's post in <#100>"));
    assert!(lines.contains(&"• Logs: (local)"));
}
