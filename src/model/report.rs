// Value types produced by the reconciliation engine.
use crate::error::DateColumnError;
use crate::model::{Label, SheetKind, UserId};
use chrono::NaiveDate;
use std::fmt;

/// What the engine decided for one row's cell in today's column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellChange {
    /// Current value differs from (or is not) the desired boolean.
    Write,
    Unchanged,
    /// Outcome computed, but the sheet's date column did not resolve.
    Blocked,
    /// The label has no usable row, so nothing can be written.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOutcome {
    pub sheet: SheetKind,
    pub label: Label,
    /// 0-based grid row; `None` for labels that have no row.
    pub row: Option<usize>,
    pub desired: bool,
    /// Value read from today's cell, if it was a boolean.
    pub current: Option<bool>,
    pub change: CellChange,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SheetTally {
    pub set_true: usize,
    pub set_false: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub blocked: usize,
    /// Rows whose desired value is TRUE, whether or not a write was needed.
    /// Failed writes are subtracted later, see `RunReport::marked_today`.
    pub marked: usize,
}

impl SheetTally {
    pub(crate) fn record(&mut self, outcome: &RowOutcome) {
        match outcome.change {
            CellChange::Write if outcome.desired => self.set_true += 1,
            CellChange::Write => self.set_false += 1,
            CellChange::Unchanged => self.unchanged += 1,
            CellChange::Blocked => self.blocked += 1,
            CellChange::Skipped => self.skipped += 1,
        }
        if outcome.desired && outcome.change != CellChange::Skipped {
            self.marked += 1;
        }
    }

    pub fn writes(&self) -> usize {
        self.set_true + self.set_false
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReactionCounts {
    pub total: usize,
    pub matched: usize,
    pub unmapped: usize,
}

/// Non-fatal findings surfaced in the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataWarning {
    UnmappedReactor {
        user_id: UserId,
    },
    LabelWithoutRow {
        user_id: UserId,
        label: Label,
    },
    UnknownRosterLabel {
        group: String,
        label: Label,
    },
    DuplicateMapping {
        user_id: UserId,
        kept: Label,
        ignored: Label,
    },
    DuplicateRowLabel {
        sheet: SheetKind,
        label: Label,
        row: usize,
    },
    DateColumn {
        sheet: SheetKind,
        error: DateColumnError,
    },
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataWarning::UnmappedReactor { user_id } => {
                write!(f, "reacting user {} has no member mapping", user_id)
            }
            DataWarning::LabelWithoutRow { user_id, label } => write!(
                f,
                "user {} maps to '{}', which has no Individuals row",
                user_id, label
            ),
            DataWarning::UnknownRosterLabel { group, label } => write!(
                f,
                "group '{}' lists '{}', which has no Individuals row",
                group, label
            ),
            DataWarning::DuplicateMapping {
                user_id,
                kept,
                ignored,
            } => write!(
                f,
                "user {} is mapped twice; kept '{}', ignored '{}'",
                user_id, kept, ignored
            ),
            DataWarning::DuplicateRowLabel { sheet, label, row } => write!(
                f,
                "{} row {} repeats label '{}' and was skipped",
                sheet,
                row + 1,
                label
            ),
            DataWarning::DateColumn { sheet, error } => write!(f, "{}: {}", sheet, error),
        }
    }
}

/// Everything the engine computed for one run. Pure value; formatting it
/// or dropping it has no effect on the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub date: NaiveDate,
    /// Individuals outcomes (skipped labels included), then Groups rows in
    /// sheet order.
    pub outcomes: Vec<RowOutcome>,
    pub individuals: SheetTally,
    pub groups: SheetTally,
    pub reactions: ReactionCounts,
    pub warnings: Vec<DataWarning>,
    /// TRUE count in yesterday's Individuals column, when that column exists.
    pub yesterday_marked: Option<usize>,
}

impl ReconciliationReport {
    pub fn tally(&self, sheet: SheetKind) -> &SheetTally {
        match sheet {
            SheetKind::Individuals => &self.individuals,
            SheetKind::Groups => &self.groups,
        }
    }

    pub fn outcome(&self, sheet: SheetKind, label: &str) -> Option<&RowOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.sheet == sheet && o.label == label && o.change != CellChange::Skipped)
    }

    /// Desired value for a row, if the engine produced one.
    pub fn desired(&self, sheet: SheetKind, label: &str) -> Option<bool> {
        self.outcome(sheet, label).map(|o| o.desired)
    }

    /// Whether today's column failed to resolve for `sheet`.
    pub fn column_unresolved(&self, sheet: SheetKind) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, DataWarning::DateColumn { sheet: s, .. } if *s == sheet))
    }
}
