// Typed error kinds exposed by the reconciliation core.
use chrono::NaiveDate;
use thiserror::Error;

/// Fatal setup problems. The run stops before any cell is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("required sheet '{0}' not found in the spreadsheet")]
    MissingSheet(String),

    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// Today's column could not be picked out of a header row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateColumnError {
    #[error("no date column found for {date} in header row {header_row}")]
    NotFound { date: NaiveDate, header_row: usize },

    #[error("date {date} appears in more than one column ({})", columns_a1(.columns))]
    Ambiguous { date: NaiveDate, columns: Vec<usize> },
}

fn columns_a1(columns: &[usize]) -> String {
    columns
        .iter()
        .map(|c| crate::model::column_letters(*c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that end a run with a failure exit.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("failed to publish run summary: {0:#}")]
    Publish(anyhow::Error),
}
