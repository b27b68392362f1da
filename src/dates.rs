// Locates today's column in a sheet's header row.
use crate::error::DateColumnError;
use crate::model::Grid;
use chrono::NaiveDate;

/// Parses a header cell as a calendar date.
///
/// Accepted: `YYYY-MM-DD`, `M/D/YYYY`, `MM/DD/YYYY`, and `M/D/YY`
/// (read as 20YY). Anything else yields `None`.
pub fn parse_header_date(text: &str) -> Option<NaiveDate> {
    let text = text.replace('\u{a0}', " ");
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if text.contains('-') {
        return NaiveDate::parse_from_str(text, "%Y-%m-%d").ok();
    }

    let mut parts = text.split('/');
    let (Some(m), Some(d), Some(y), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    if [m, d, y]
        .iter()
        .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
        || m.len() > 2
        || d.len() > 2
    {
        return None;
    }

    let month: u32 = m.parse().ok()?;
    let day: u32 = d.parse().ok()?;
    let year: i32 = match y.len() {
        2 => 2000 + y.parse::<i32>().ok()?,
        4 => y.parse().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Finds the single column whose header parses to `date`.
///
/// Column A (index 0) holds row labels and is never considered.
/// `header_row` is the 1-based spreadsheet row, used in error messages.
pub fn find_date_column(
    header: &[String],
    date: NaiveDate,
    header_row: usize,
) -> Result<usize, DateColumnError> {
    let columns: Vec<usize> = header
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, text)| parse_header_date(text) == Some(date))
        .map(|(idx, _)| idx)
        .collect();

    match columns.as_slice() {
        [] => Err(DateColumnError::NotFound { date, header_row }),
        [col] => Ok(*col),
        _ => Err(DateColumnError::Ambiguous { date, columns }),
    }
}

/// Resolves the date column of a whole sheet, reading `header_row` (1-based).
pub fn resolve_sheet_column(
    grid: &Grid,
    header_row: usize,
    date: NaiveDate,
) -> Result<usize, DateColumnError> {
    let header = grid
        .row(header_row.saturating_sub(1))
        .unwrap_or_default();
    find_date_column(header, date, header_row)
}
