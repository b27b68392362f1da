// Ragged sheet grid as read from the tabular store, plus A1 helpers.
use serde::{Deserialize, Serialize};

/// A full sheet as rows of display strings.
///
/// Rows may have different lengths; a missing cell reads as blank.
/// Row and column indices are 0-based (row 0 is spreadsheet row 1,
/// column 0 is column A).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Build a grid from string slices. Handy for fixtures.
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, row: usize) -> Option<&[String]> {
        self.rows.get(row).map(|r| r.as_slice())
    }

    /// Cell text, or "" when outside the populated area.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    /// Overwrite a cell, growing the grid as needed.
    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<String>) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let r = &mut self.rows[row];
        if r.len() <= col {
            r.resize(col + 1, String::new());
        }
        r[col] = value.into();
    }

    /// Reads a cell as a checkbox value.
    ///
    /// Only `TRUE` and `FALSE` (any case, surrounding whitespace ignored)
    /// count; blank or anything else is `None`.
    pub fn bool_cell(&self, row: usize, col: usize) -> Option<bool> {
        parse_bool_cell(self.cell(row, col))
    }
}

pub fn parse_bool_cell(text: &str) -> Option<bool> {
    let t = text.trim();
    if t.eq_ignore_ascii_case("true") {
        Some(true)
    } else if t.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

pub fn bool_cell_text(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

/// Column letters for a 0-based index: 0 -> A, 25 -> Z, 26 -> AA.
pub fn column_letters(col: usize) -> String {
    let mut n = col + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// A1 reference for a 0-based cell, e.g. (1, 2) -> "C2".
pub fn a1_cell(row: usize, col: usize) -> String {
    format!("{}{}", column_letters(col), row + 1)
}

/// A1 range scoped to a sheet, quoting the title as the Sheets API expects.
pub fn a1_sheet_cell(sheet: &str, row: usize, col: usize) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), a1_cell(row, col))
}
