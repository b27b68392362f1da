//! Member Mapping and Groups sheet parsing.
//!
//! Member Mapping: column A = user id, column B = Individuals label, with a
//! header in row 1. Groups: column A = group name, column B =
//! comma-separated roster, with data below the sheet's date header row.

use crate::error::ConfigurationError;
use crate::model::{DataWarning, Grid, Label, UserId};
use std::collections::HashMap;

/// `UserId -> Label`. Each user id maps to at most one label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserMapping {
    labels: HashMap<UserId, Label>,
}

impl UserMapping {
    pub fn label_for(&self, user_id: &str) -> Option<&str> {
        self.labels.get(user_id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<U: Into<UserId>, L: Into<Label>> FromIterator<(U, L)> for UserMapping {
    fn from_iter<I: IntoIterator<Item = (U, L)>>(iter: I) -> Self {
        let mut labels = HashMap::new();
        for (u, l) in iter {
            labels.entry(u.into()).or_insert_with(|| l.into());
        }
        Self { labels }
    }
}

/// One row of the Groups sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    /// 0-based grid row in the Groups sheet.
    pub row: usize,
    /// Trimmed, de-duplicated labels in first-seen order.
    pub roster: Vec<Label>,
}

impl Group {
    pub fn new(name: impl Into<String>, row: usize, roster_cell: &str) -> Self {
        Self {
            name: name.into(),
            row,
            roster: split_roster(roster_cell),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mappings {
    pub users: UserMapping,
    pub groups: Vec<Group>,
    /// Duplicate user ids found while loading.
    pub warnings: Vec<DataWarning>,
}

/// Splits a roster cell on commas, trimming entries and dropping empty
/// ones and repeats.
pub fn split_roster(cell: &str) -> Vec<Label> {
    let mut out: Vec<Label> = Vec::new();
    for part in cell.split(',') {
        let label = part.trim();
        if label.is_empty() || out.iter().any(|l| l == label) {
            continue;
        }
        out.push(label.to_string());
    }
    out
}

/// Builds the user mapping. Rows with an empty id or label are skipped.
pub fn load_user_mapping(grid: &Grid) -> (UserMapping, Vec<DataWarning>) {
    let mut labels: HashMap<UserId, Label> = HashMap::new();
    let mut warnings = Vec::new();

    for row in grid.rows.iter().skip(1) {
        let user_id = row.first().map(|s| s.trim()).unwrap_or("");
        let label = row.get(1).map(|s| s.trim()).unwrap_or("");
        if user_id.is_empty() || label.is_empty() {
            continue;
        }
        match labels.get(user_id) {
            Some(kept) => {
                if kept != label {
                    warnings.push(DataWarning::DuplicateMapping {
                        user_id: user_id.to_string(),
                        kept: kept.clone(),
                        ignored: label.to_string(),
                    });
                }
            }
            None => {
                labels.insert(user_id.to_string(), label.to_string());
            }
        }
    }

    (UserMapping { labels }, warnings)
}

/// Reads group rows below `header_row` (1-based). Rows without a group
/// name are ignored.
pub fn load_groups(grid: &Grid, header_row: usize) -> Vec<Group> {
    grid.rows
        .iter()
        .enumerate()
        .skip(header_row.max(1))
        .filter_map(|(idx, row)| {
            let name = row.first().map(|s| s.trim()).unwrap_or("");
            if name.is_empty() {
                return None;
            }
            let roster = row.get(1).map(|s| s.as_str()).unwrap_or("");
            Some(Group::new(name, idx, roster))
        })
        .collect()
}

/// Loads both relations.
///
/// `None` means the sheet does not exist at all, which is a configuration
/// error; an empty sheet is fine and yields empty relations.
pub fn load_mappings(
    mapping_sheet: Option<&Grid>,
    mapping_title: &str,
    groups_sheet: Option<&Grid>,
    groups_title: &str,
    groups_header_row: usize,
) -> Result<Mappings, ConfigurationError> {
    let mapping = mapping_sheet
        .ok_or_else(|| ConfigurationError::MissingSheet(mapping_title.to_string()))?;
    let groups = groups_sheet
        .ok_or_else(|| ConfigurationError::MissingSheet(groups_title.to_string()))?;

    let (users, warnings) = load_user_mapping(mapping);
    let groups = load_groups(groups, groups_header_row);
    log::debug!(
        "Loaded {} member mappings and {} groups",
        users.len(),
        groups.len()
    );

    Ok(Mappings {
        users,
        groups,
        warnings,
    })
}
