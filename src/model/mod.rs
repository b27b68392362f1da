// File: ./src/model/mod.rs
pub mod grid;
pub mod report;

pub use grid::{Grid, a1_cell, a1_sheet_cell, bool_cell_text, column_letters, parse_bool_cell};
pub use report::{
    CellChange, DataWarning, ReactionCounts, ReconciliationReport, RowOutcome, SheetTally,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque messaging-platform user identifier (a Discord snowflake).
pub type UserId = String;

/// Row label of a tracked person, as written in column A of the Individuals sheet.
pub type Label = String;

/// Users who reacted to today's post with the tracked emoji.
pub type ReactionSet = BTreeSet<UserId>;

/// The two sheets the engine writes outcomes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SheetKind {
    Individuals,
    Groups,
}

impl fmt::Display for SheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetKind::Individuals => write!(f, "Individuals"),
            SheetKind::Groups => write!(f, "Groups"),
        }
    }
}

/// One checkbox update the engine wants applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellWrite {
    pub sheet: SheetKind,
    /// Sheet title in the store, e.g. "Individuals".
    pub sheet_title: String,
    /// Row label (individual or group name) the cell belongs to.
    pub label: String,
    pub row: usize,
    pub col: usize,
    pub value: bool,
}

impl CellWrite {
    pub fn a1(&self) -> String {
        a1_cell(self.row, self.col)
    }

    pub fn text(&self) -> &'static str {
        bool_cell_text(self.value)
    }
}

impl fmt::Display for CellWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}!{} ({}) = {}",
            self.sheet_title,
            self.a1(),
            self.label,
            self.text()
        )
    }
}
