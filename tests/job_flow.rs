// File: tests/job_flow.rs
use chrono::{DateTime, NaiveDate};
use rollcall::apply::{RunMode, WriteStatus};
use rollcall::client::{MemoryStore, RecordingPublisher, StaticSource};
use rollcall::config::Config;
use rollcall::error::{ConfigurationError, RunError};
use rollcall::job::{self, RunOutcome};
use rollcall::model::{Grid, SheetKind};
use rollcall::summary::RunMeta;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
}

fn meta() -> RunMeta {
    let started = DateTime::parse_from_rfc3339("2026-01-01T06:05:00-08:00").unwrap();
    RunMeta::new("Morning Check", started)
}

fn config() -> Config {
    let mut config = Config::default();
    config.discord.track_channel_id = "100".into();
    config
}

fn seeded_store() -> MemoryStore {
    MemoryStore::new()
        .with_sheet(
            "Individuals",
            Grid::from_rows([
                vec!["Name", "12/31/2025", "1/1/2026"],
                vec!["Alice", "TRUE", ""],
                vec!["Bob", "FALSE", "TRUE"],
                vec!["Cara", "TRUE", ""],
            ]),
        )
        .with_sheet(
            "Groups",
            Grid::from_rows([
                vec!["Group", "Roster", "1/1/2026"],
                vec!["Team A", "Alice, Cara", ""],
            ]),
        )
        .with_sheet(
            "Member Mapping",
            Grid::from_rows([
                vec!["User ID", "Label"],
                vec!["u1", "Alice"],
                vec!["u2", "Bob"],
                vec!["u3", "Cara"],
            ]),
        )
}

#[tokio::test]
async fn test_live_run_writes_and_second_run_is_idempotent() {
    let store = seeded_store();
    let source = StaticSource::reactors(["u1", "u3"]);
    let publisher = RecordingPublisher::new();
    let config = config();

    let outcome = job::run(&config, today(), meta(), &source, &store, &publisher)
        .await
        .unwrap();
    let report = outcome.report().expect("completed run");
    // Alice TRUE, Bob FALSE, Cara TRUE, Team A TRUE.
    assert_eq!(report.apply.attempted(), 4);
    assert_eq!(report.apply.succeeded(), 4);
    assert_eq!(store.write_count(), 4);

    let individuals = store.sheet("Individuals").unwrap();
    assert_eq!(individuals.cell(1, 2), "TRUE");
    assert_eq!(individuals.cell(2, 2), "FALSE");
    assert_eq!(individuals.cell(3, 2), "TRUE");
    assert_eq!(store.sheet("Groups").unwrap().cell(1, 2), "TRUE");
    assert_eq!(report.reconciliation.yesterday_marked, Some(2));

    let second = job::run(&config, today(), meta(), &source, &store, &publisher)
        .await
        .unwrap();
    let second = second.report().unwrap();
    assert_eq!(second.apply.attempted(), 0);
    assert_eq!(store.write_count(), 4);
    assert_eq!(publisher.messages().len(), 2);
}

#[tokio::test]
async fn test_dry_run_reports_the_same_changes_without_writing() {
    let live_store = seeded_store();
    let dry_store = seeded_store();
    let source = StaticSource::reactors(["u1"]);

    let live = job::execute(&config(), today(), &source, &live_store)
        .await
        .unwrap();
    let mut dry_config = config();
    dry_config.dry_run = true;
    let dry = job::execute(&dry_config, today(), &source, &dry_store)
        .await
        .unwrap();

    let live = live.report().unwrap();
    let dry = dry.report().unwrap();
    assert_eq!(live.reconciliation, dry.reconciliation);
    assert_eq!(dry.mode, RunMode::DryRun);
    assert_eq!(dry_store.write_count(), 0);
    assert_eq!(dry_store.sheet("Individuals"), seeded_store().sheet("Individuals"));
    assert!(
        dry.apply
            .results
            .iter()
            .all(|r| r.status == WriteStatus::Simulated)
    );
    assert_eq!(dry.apply.attempted(), live.apply.attempted());
}

#[tokio::test]
async fn test_failed_write_does_not_stop_the_others() {
    let store = seeded_store();
    store.fail_cell("Individuals", 1, 2);
    let source = StaticSource::reactors(["u1", "u3"]);

    let outcome = job::execute(&config(), today(), &source, &store)
        .await
        .unwrap();
    let report = outcome.report().unwrap();
    assert_eq!(report.apply.attempted(), 4);
    assert_eq!(report.apply.failed(), 1);
    assert_eq!(store.write_count(), 3);
    assert_eq!(store.sheet("Groups").unwrap().cell(1, 2), "TRUE");
}

#[tokio::test]
async fn test_failed_mark_is_not_counted_as_marked() {
    let store = seeded_store();
    store.fail_cell("Individuals", 1, 2);
    let source = StaticSource::reactors(["u1", "u3"]);
    let publisher = RecordingPublisher::new();

    let outcome = job::run(&config(), today(), meta(), &source, &store, &publisher)
        .await
        .unwrap();
    let report = outcome.report().unwrap();
    // Alice and Cara should be TRUE, but Alice's cell could not be written.
    assert_eq!(report.reconciliation.individuals.marked, 2);
    assert_eq!(report.marked_today(), 1);

    let messages = publisher.messages();
    assert!(messages[0].lines().any(|l| l == "• Today marked: 1"));
}

#[tokio::test]
async fn test_missing_post_publishes_failure_and_writes_nothing() {
    let store = seeded_store();
    let publisher = RecordingPublisher::new();

    let outcome = job::run(
        &config(),
        today(),
        meta(),
        &StaticSource::NoPost,
        &store,
        &publisher,
    )
    .await
    .unwrap();

    assert!(matches!(outcome, RunOutcome::Failed { .. }));
    assert_eq!(store.write_count(), 0);
    let messages = publisher.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("❌ Roll call failed"));
    assert!(messages[0].contains("Could not find today's post in <#100>"));
}

#[tokio::test]
async fn test_unreachable_source_is_a_failed_run() {
    let store = seeded_store();
    let publisher = RecordingPublisher::new();
    let source = StaticSource::Unreachable("connection reset".into());

    let outcome = job::run(&config(), today(), meta(), &source, &store, &publisher)
        .await
        .unwrap();
    match outcome {
        RunOutcome::Failed { reason } => assert!(reason.contains("connection reset")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_missing_sheet_is_configuration_error() {
    let store = MemoryStore::new()
        .with_sheet("Individuals", Grid::from_rows([vec!["Name", "1/1/2026"]]))
        .with_sheet("Member Mapping", Grid::default());
    let publisher = RecordingPublisher::new();
    let source = StaticSource::reactors(["u1"]);

    let err = job::run(&config(), today(), meta(), &source, &store, &publisher)
        .await
        .unwrap_err();
    match err {
        RunError::Configuration(ConfigurationError::MissingSheet(title)) => {
            assert_eq!(title, "Groups")
        }
        other => panic!("unexpected error {:?}", other),
    }
    let messages = publisher.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("required sheet 'Groups' not found"));
}

#[tokio::test]
async fn test_empty_mapping_sheet_is_not_an_error() {
    let store = seeded_store();
    store.insert_sheet("Member Mapping", Grid::default());
    let source = StaticSource::reactors(["u1"]);

    let outcome = job::execute(&config(), today(), &source, &store)
        .await
        .unwrap();
    let report = outcome.report().unwrap();
    assert_eq!(report.reconciliation.reactions.unmapped, 1);
    assert_eq!(
        report.reconciliation.desired(SheetKind::Individuals, "Alice"),
        Some(false)
    );
}

#[tokio::test]
async fn test_publish_failure_is_reported() {
    let store = seeded_store();
    let source = StaticSource::reactors(["u1"]);

    let err = job::run(
        &config(),
        today(),
        meta(),
        &source,
        &store,
        &RecordingPublisher::failing(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RunError::Publish(_)));
    // The writes already happened.
    assert!(store.write_count() > 0);
}
