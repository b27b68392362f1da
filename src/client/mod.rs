// File: ./src/client/mod.rs
//! Seams to the outside world: where reactions come from, where the grid
//! lives, and where the summary goes.
pub mod auth;
pub mod discord;
pub mod http;
pub mod memory;
pub mod sheets;

pub use crate::client::discord::DiscordClient;
pub use crate::client::memory::{MemoryStore, RecordingPublisher, StaticSource};
pub use crate::client::sheets::SheetsClient;

use crate::model::{Grid, ReactionSet};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Users who reacted to the tracked post for `today`.
    ///
    /// `Ok(None)` means no tracked post was found for that date.
    async fn todays_reactors(&self, today: NaiveDate) -> Result<Option<ReactionSet>>;
}

#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Whole sheet as display strings. `Ok(None)` when no sheet has that title.
    async fn read_sheet(&self, title: &str) -> Result<Option<Grid>>;

    /// Writes one cell; `row` and `col` are 0-based.
    async fn write_cell(&self, title: &str, row: usize, col: usize, value: &str) -> Result<()>;
}

#[async_trait]
pub trait SummaryPublisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<()>;
}
