//! Reconciliation engine.
//!
//! Turns today's reactions, the member/group relations and the current
//! contents of the Individuals and Groups sheets into the minimal list of
//! checkbox writes plus a [`ReconciliationReport`].
//!
//! Rules:
//! - An Individuals row is TRUE iff some reacting user maps to its label.
//! - A group is TRUE iff its roster, restricted to labels that have an
//!   Individuals row, is non-empty and every member is TRUE.
//! - A write is emitted only when the cell does not already hold the
//!   desired `TRUE`/`FALSE`, so running again on the result emits nothing.
//! - A sheet whose date column did not resolve gets no writes, but its
//!   outcomes are still computed and reported.

use crate::error::DateColumnError;
use crate::mapping::Mappings;
use crate::model::{
    CellChange, CellWrite, DataWarning, Grid, Label, ReactionCounts, ReactionSet,
    ReconciliationReport, RowOutcome, SheetKind, SheetTally,
};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

/// One target sheet as seen by the engine.
#[derive(Debug, Clone)]
pub struct SheetInput<'a> {
    pub title: &'a str,
    pub grid: &'a Grid,
    /// 1-based header row; data rows follow it.
    pub header_row: usize,
    pub column: Result<usize, DateColumnError>,
}

#[derive(Debug, Clone)]
pub struct ReconcileInput<'a> {
    pub date: NaiveDate,
    pub reactions: &'a ReactionSet,
    pub mappings: &'a Mappings,
    pub individuals: SheetInput<'a>,
    pub groups: SheetInput<'a>,
    /// Individuals column-A values that are never tracked (section headings).
    pub skip_labels: &'a [String],
    /// Yesterday's Individuals column, if it resolved.
    pub yesterday_column: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Individuals writes in row order, then Groups writes in row order.
    pub writes: Vec<CellWrite>,
    pub report: ReconciliationReport,
}

/// Tracked Individuals rows: first row per label, in sheet order.
struct IndividualRows {
    ordered: Vec<(Label, usize)>,
    by_label: HashMap<Label, usize>,
}

impl IndividualRows {
    fn contains(&self, label: &str) -> bool {
        self.by_label.contains_key(label)
    }
}

fn scan_individual_rows(
    sheet: &SheetInput<'_>,
    skip_labels: &[String],
    outcomes: &mut Vec<RowOutcome>,
    warnings: &mut Vec<DataWarning>,
) -> IndividualRows {
    let mut ordered = Vec::new();
    let mut by_label = HashMap::new();

    for row in sheet.header_row..sheet.grid.row_count() {
        let label = sheet.grid.cell(row, 0).trim();
        if label.is_empty() || skip_labels.iter().any(|s| s == label) {
            continue;
        }
        if by_label.contains_key(label) {
            warnings.push(DataWarning::DuplicateRowLabel {
                sheet: SheetKind::Individuals,
                label: label.to_string(),
                row,
            });
            outcomes.push(RowOutcome {
                sheet: SheetKind::Individuals,
                label: label.to_string(),
                row: Some(row),
                desired: false,
                current: None,
                change: CellChange::Skipped,
            });
            continue;
        }
        by_label.insert(label.to_string(), row);
        ordered.push((label.to_string(), row));
    }

    IndividualRows { ordered, by_label }
}

/// Compares the desired value against the sheet and records the outcome,
/// pushing a write when the cell needs one.
fn decide(
    sheet_kind: SheetKind,
    sheet: &SheetInput<'_>,
    label: &str,
    row: usize,
    desired: bool,
    writes: &mut Vec<CellWrite>,
) -> RowOutcome {
    let (current, change) = match &sheet.column {
        Err(_) => (None, CellChange::Blocked),
        Ok(col) => {
            let current = sheet.grid.bool_cell(row, *col);
            if current == Some(desired) {
                (current, CellChange::Unchanged)
            } else {
                writes.push(CellWrite {
                    sheet: sheet_kind,
                    sheet_title: sheet.title.to_string(),
                    label: label.to_string(),
                    row,
                    col: *col,
                    value: desired,
                });
                (current, CellChange::Write)
            }
        }
    };

    RowOutcome {
        sheet: sheet_kind,
        label: label.to_string(),
        row: Some(row),
        desired,
        current,
        change,
    }
}

pub fn reconcile(input: &ReconcileInput<'_>) -> Reconciliation {
    let mut writes = Vec::new();
    let mut outcomes = Vec::new();
    let mut warnings = Vec::new();

    for (kind, sheet) in [
        (SheetKind::Individuals, &input.individuals),
        (SheetKind::Groups, &input.groups),
    ] {
        if let Err(e) = &sheet.column {
            warnings.push(DataWarning::DateColumn {
                sheet: kind,
                error: e.clone(),
            });
        }
    }
    warnings.extend(input.mappings.warnings.iter().cloned());

    let rows = scan_individual_rows(
        &input.individuals,
        input.skip_labels,
        &mut outcomes,
        &mut warnings,
    );

    // Who reacted, by label.
    let mut reactions = ReactionCounts {
        total: input.reactions.len(),
        ..Default::default()
    };
    let mut reacted: HashSet<&str> = HashSet::new();
    let mut rowless: BTreeSet<&str> = BTreeSet::new();
    for user_id in input.reactions {
        match input.mappings.users.label_for(user_id) {
            None => {
                reactions.unmapped += 1;
                warnings.push(DataWarning::UnmappedReactor {
                    user_id: user_id.clone(),
                });
            }
            Some(label) => {
                reactions.matched += 1;
                if rows.contains(label) {
                    reacted.insert(label);
                } else {
                    warnings.push(DataWarning::LabelWithoutRow {
                        user_id: user_id.clone(),
                        label: label.to_string(),
                    });
                    rowless.insert(label);
                }
            }
        }
    }

    for (label, row) in &rows.ordered {
        let desired = reacted.contains(label.as_str());
        outcomes.push(decide(
            SheetKind::Individuals,
            &input.individuals,
            label,
            *row,
            desired,
            &mut writes,
        ));
    }
    for label in rowless {
        outcomes.push(RowOutcome {
            sheet: SheetKind::Individuals,
            label: label.to_string(),
            row: None,
            desired: true,
            current: None,
            change: CellChange::Skipped,
        });
    }

    for group in &input.mappings.groups {
        let mut known = Vec::with_capacity(group.roster.len());
        for label in &group.roster {
            if rows.contains(label) {
                known.push(label.as_str());
            } else {
                warnings.push(DataWarning::UnknownRosterLabel {
                    group: group.name.clone(),
                    label: label.clone(),
                });
            }
        }
        // An empty resolved roster never counts as complete.
        let desired = !known.is_empty() && known.iter().all(|l| reacted.contains(l));
        outcomes.push(decide(
            SheetKind::Groups,
            &input.groups,
            &group.name,
            group.row,
            desired,
            &mut writes,
        ));
    }

    let mut individuals = SheetTally::default();
    let mut groups = SheetTally::default();
    for outcome in &outcomes {
        match outcome.sheet {
            SheetKind::Individuals => individuals.record(outcome),
            SheetKind::Groups => groups.record(outcome),
        }
    }

    let yesterday_marked = input.yesterday_column.map(|col| {
        rows.ordered
            .iter()
            .filter(|(_, row)| input.individuals.grid.bool_cell(*row, col) == Some(true))
            .count()
    });

    Reconciliation {
        writes,
        report: ReconciliationReport {
            date: input.date,
            outcomes,
            individuals,
            groups,
            reactions,
            warnings,
            yesterday_marked,
        },
    }
}
