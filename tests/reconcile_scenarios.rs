// File: tests/reconcile_scenarios.rs
use chrono::NaiveDate;
use rollcall::dates::resolve_sheet_column;
use rollcall::error::DateColumnError;
use rollcall::mapping::load_mappings;
use rollcall::model::{CellChange, DataWarning, Grid, ReactionSet, SheetKind};
use rollcall::reconcile::{ReconcileInput, Reconciliation, SheetInput, reconcile};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn reactors(ids: &[&str]) -> ReactionSet {
    ids.iter().map(|s| s.to_string()).collect()
}

fn individuals() -> Grid {
    Grid::from_rows([
        vec!["Name", "1/1/2026", "1/2/2026"],
        vec!["Alice", "", ""],
        vec!["Bob", "FALSE", ""],
        vec!["Cara", "TRUE", ""],
    ])
}

fn groups() -> Grid {
    Grid::from_rows([
        vec!["Group", "Roster", "1/1/2026", "1/2/2026"],
        vec!["Team A", "Alice, Bob", "", ""],
        vec!["Team B", "Cara, Ghost", "", ""],
        vec!["Empty", "", "", ""],
    ])
}

fn mapping() -> Grid {
    Grid::from_rows([
        vec!["User ID", "Label"],
        vec!["u1", "Alice"],
        vec!["u2", "Bob"],
        vec!["u3", "Cara"],
        vec!["u9", "Ghost"],
    ])
}

fn run_with(
    date: NaiveDate,
    reactions: &ReactionSet,
    individuals: &Grid,
    groups: &Grid,
    mapping: &Grid,
    skip_labels: &[String],
) -> Reconciliation {
    let mappings = load_mappings(
        Some(mapping),
        "Member Mapping",
        Some(groups),
        "Groups",
        1,
    )
    .unwrap();
    let yesterday_column = date
        .pred_opt()
        .and_then(|y| resolve_sheet_column(individuals, 1, y).ok());
    reconcile(&ReconcileInput {
        date,
        reactions,
        mappings: &mappings,
        individuals: SheetInput {
            title: "Individuals",
            grid: individuals,
            header_row: 1,
            column: resolve_sheet_column(individuals, 1, date),
        },
        groups: SheetInput {
            title: "Groups",
            grid: groups,
            header_row: 1,
            column: resolve_sheet_column(groups, 1, date),
        },
        skip_labels,
        yesterday_column,
    })
}

fn run(date: NaiveDate, reactions: &ReactionSet) -> Reconciliation {
    run_with(date, reactions, &individuals(), &groups(), &mapping(), &[])
}

#[test]
fn test_reactors_are_marked_and_others_cleared() {
    let result = run(day(2026, 1, 1), &reactors(&["u1", "u2"]));
    let report = &result.report;

    assert_eq!(report.desired(SheetKind::Individuals, "Alice"), Some(true));
    assert_eq!(report.desired(SheetKind::Individuals, "Bob"), Some(true));
    assert_eq!(report.desired(SheetKind::Individuals, "Cara"), Some(false));

    let individual_writes: Vec<_> = result
        .writes
        .iter()
        .filter(|w| w.sheet == SheetKind::Individuals)
        .map(|w| (w.label.as_str(), w.row, w.col, w.value))
        .collect();
    assert_eq!(
        individual_writes,
        vec![
            ("Alice", 1, 1, true),
            ("Bob", 2, 1, true),
            ("Cara", 3, 1, false)
        ]
    );

    assert_eq!(report.individuals.set_true, 2);
    assert_eq!(report.individuals.set_false, 1);
    assert_eq!(report.individuals.marked, 2);
    assert_eq!(report.reactions.total, 2);
    assert_eq!(report.reactions.matched, 2);
    assert_eq!(report.reactions.unmapped, 0);
}

#[test]
fn test_group_needs_every_member() {
    let result = run(day(2026, 1, 1), &reactors(&["u1", "u2"]));
    let report = &result.report;

    assert_eq!(report.desired(SheetKind::Groups, "Team A"), Some(true));
    // Ghost has no Individuals row, so Team B only depends on Cara.
    assert_eq!(report.desired(SheetKind::Groups, "Team B"), Some(false));
    assert_eq!(report.desired(SheetKind::Groups, "Empty"), Some(false));

    let group_writes: Vec<_> = result
        .writes
        .iter()
        .filter(|w| w.sheet == SheetKind::Groups)
        .map(|w| (w.label.as_str(), w.row, w.col, w.value))
        .collect();
    assert_eq!(
        group_writes,
        vec![
            ("Team A", 1, 2, true),
            ("Team B", 2, 2, false),
            ("Empty", 3, 2, false)
        ]
    );
    assert_eq!(report.tally(SheetKind::Groups).writes(), 3);
    assert!(report.warnings.contains(&DataWarning::UnknownRosterLabel {
        group: "Team B".into(),
        label: "Ghost".into(),
    }));
}

#[test]
fn test_group_of_known_members_all_reacting_is_true() {
    let result = run(day(2026, 1, 1), &reactors(&["u3"]));
    assert_eq!(result.report.desired(SheetKind::Groups, "Team B"), Some(true));
    assert_eq!(result.report.desired(SheetKind::Groups, "Team A"), Some(false));
}

#[test]
fn test_mapped_label_without_row_is_skipped_with_warning() {
    let result = run(day(2026, 1, 1), &reactors(&["u9"]));
    let report = &result.report;

    assert!(report.warnings.contains(&DataWarning::LabelWithoutRow {
        user_id: "u9".into(),
        label: "Ghost".into(),
    }));
    let ghost = report
        .outcomes
        .iter()
        .find(|o| o.label == "Ghost")
        .expect("ghost outcome");
    assert_eq!(ghost.change, CellChange::Skipped);
    assert_eq!(ghost.row, None);
    assert_eq!(report.individuals.skipped, 1);
    assert_eq!(report.individuals.marked, 0);
    assert_eq!(report.reactions.matched, 1);
    assert!(result.writes.iter().all(|w| w.label != "Ghost"));
}

#[test]
fn test_unmapped_reactor_is_counted_not_written() {
    let result = run(day(2026, 1, 1), &reactors(&["u1", "stranger"]));
    let report = &result.report;

    assert_eq!(report.reactions.total, 2);
    assert_eq!(report.reactions.unmapped, 1);
    assert!(report.warnings.contains(&DataWarning::UnmappedReactor {
        user_id: "stranger".into()
    }));
    assert_eq!(report.desired(SheetKind::Individuals, "Alice"), Some(true));
}

#[test]
fn test_no_reactions_clears_everything() {
    let result = run(day(2026, 1, 1), &ReactionSet::new());
    let report = &result.report;

    assert_eq!(report.individuals.marked, 0);
    // Bob already FALSE, Alice blank, Cara TRUE.
    assert_eq!(report.individuals.unchanged, 1);
    assert_eq!(report.individuals.set_false, 2);
    assert!(result.writes.iter().all(|w| !w.value));
}

#[test]
fn test_missing_date_column_blocks_writes_but_reports_outcomes() {
    let result = run(day(2026, 1, 5), &reactors(&["u1"]));
    let report = &result.report;

    assert!(result.writes.is_empty());
    assert_eq!(report.desired(SheetKind::Individuals, "Alice"), Some(true));
    assert_eq!(
        report.outcome(SheetKind::Individuals, "Alice").unwrap().change,
        CellChange::Blocked
    );
    assert_eq!(report.individuals.blocked, 3);
    assert_eq!(report.groups.blocked, 3);
    assert!(report.column_unresolved(SheetKind::Individuals));
    assert!(report.column_unresolved(SheetKind::Groups));
    assert!(report.warnings.contains(&DataWarning::DateColumn {
        sheet: SheetKind::Individuals,
        error: DateColumnError::NotFound {
            date: day(2026, 1, 5),
            header_row: 1
        },
    }));
}

#[test]
fn test_one_sheet_blocked_other_still_written() {
    let groups = Grid::from_rows([
        vec!["Group", "Roster", "12/31/2025"],
        vec!["Team A", "Alice, Bob", ""],
    ]);
    let result = run_with(
        day(2026, 1, 1),
        &reactors(&["u1"]),
        &individuals(),
        &groups,
        &mapping(),
        &[],
    );

    assert!(result.writes.iter().all(|w| w.sheet == SheetKind::Individuals));
    assert!(!result.writes.is_empty());
    assert_eq!(result.report.groups.blocked, 1);
    assert!(!result.report.column_unresolved(SheetKind::Individuals));
}

#[test]
fn test_duplicate_row_label_tracks_first_row_only() {
    let individuals = Grid::from_rows([
        vec!["Name", "1/1/2026"],
        vec!["Alice", ""],
        vec!["Alice", ""],
    ]);
    let result = run_with(
        day(2026, 1, 1),
        &reactors(&["u1"]),
        &individuals,
        &groups(),
        &mapping(),
        &[],
    );

    let alice_writes: Vec<_> = result
        .writes
        .iter()
        .filter(|w| w.label == "Alice")
        .map(|w| w.row)
        .collect();
    assert_eq!(alice_writes, vec![1]);
    assert!(result.report.warnings.contains(&DataWarning::DuplicateRowLabel {
        sheet: SheetKind::Individuals,
        label: "Alice".into(),
        row: 2,
    }));
}

#[test]
fn test_skip_labels_are_not_tracked() {
    let individuals = Grid::from_rows([
        vec!["Name", "1/1/2026"],
        vec!["Week 1", ""],
        vec!["Alice", ""],
        vec!["", ""],
        vec!["Bob", ""],
    ]);
    let result = run_with(
        day(2026, 1, 1),
        &reactors(&["u1"]),
        &individuals,
        &groups(),
        &mapping(),
        &["Week 1".to_string()],
    );

    assert!(result.report.outcomes.iter().all(|o| o.label != "Week 1"));
    let rows: Vec<_> = result
        .writes
        .iter()
        .filter(|w| w.sheet == SheetKind::Individuals)
        .map(|w| (w.row, w.value))
        .collect();
    assert_eq!(rows, vec![(2, true), (4, false)]);
}

#[test]
fn test_non_boolean_cell_is_always_rewritten() {
    let individuals = Grid::from_rows([
        vec!["Name", "1/1/2026"],
        vec!["Alice", "yes"],
        vec!["Bob", " false "],
    ]);
    let result = run_with(
        day(2026, 1, 1),
        &reactors(&["u1"]),
        &individuals,
        &groups(),
        &mapping(),
        &[],
    );

    let labels: Vec<_> = result
        .writes
        .iter()
        .filter(|w| w.sheet == SheetKind::Individuals)
        .map(|w| w.label.as_str())
        .collect();
    assert_eq!(labels, vec!["Alice"]);
    assert_eq!(
        result.report.outcome(SheetKind::Individuals, "Bob").unwrap().change,
        CellChange::Unchanged
    );
}

#[test]
fn test_roster_labels_are_case_sensitive() {
    let groups = Grid::from_rows([
        vec!["Group", "Roster", "1/1/2026"],
        vec!["Lower", "alice", ""],
    ]);
    let result = run_with(
        day(2026, 1, 1),
        &reactors(&["u1"]),
        &individuals(),
        &groups,
        &mapping(),
        &[],
    );
    assert_eq!(result.report.desired(SheetKind::Groups, "Lower"), Some(false));
    assert!(result.report.warnings.contains(&DataWarning::UnknownRosterLabel {
        group: "Lower".into(),
        label: "alice".into(),
    }));
}

#[test]
fn test_yesterday_marked_counts_previous_column() {
    let result = run(day(2026, 1, 2), &reactors(&["u1"]));
    // 1/1/2026 column: Bob FALSE, Cara TRUE.
    assert_eq!(result.report.yesterday_marked, Some(1));

    let result = run(day(2026, 1, 1), &reactors(&["u1"]));
    assert_eq!(result.report.yesterday_marked, None);
}

#[test]
fn test_same_input_same_result() {
    let a = run(day(2026, 1, 1), &reactors(&["u2", "u1", "stranger"]));
    let b = run(day(2026, 1, 1), &reactors(&["stranger", "u1", "u2"]));
    assert_eq!(a, b);
}

#[test]
fn test_two_teams_sharing_a_member() {
    let groups = Grid::from_rows([
        vec!["Group", "Roster", "1/1/2026"],
        vec!["TeamX", "Alice, Bob", ""],
        vec!["TeamY", "Alice, Cara", ""],
        vec!["Ghost", "Zed", ""],
    ]);
    let result = run_with(
        day(2026, 1, 1),
        &reactors(&["u1", "u2"]),
        &individuals(),
        &groups,
        &mapping(),
        &[],
    );
    let report = &result.report;

    assert_eq!(report.desired(SheetKind::Individuals, "Alice"), Some(true));
    assert_eq!(report.desired(SheetKind::Individuals, "Bob"), Some(true));
    assert_eq!(report.desired(SheetKind::Individuals, "Cara"), Some(false));
    assert_eq!(report.desired(SheetKind::Groups, "TeamX"), Some(true));
    assert_eq!(report.desired(SheetKind::Groups, "TeamY"), Some(false));
    assert_eq!(report.desired(SheetKind::Groups, "Ghost"), Some(false));
    assert!(report.warnings.contains(&DataWarning::UnknownRosterLabel {
        group: "Ghost".into(),
        label: "Zed".into(),
    }));
}
