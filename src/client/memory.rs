// In-process collaborators for rehearsals and tests.
use crate::client::{MessageSource, SummaryPublisher, TabularStore};
use crate::model::{Grid, ReactionSet, a1_sheet_cell};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// Sheets held in memory. Writes land in the grid immediately.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sheets: Mutex<BTreeMap<String, Grid>>,
    /// Cells (sheet, row, col) that reject writes.
    failing: Mutex<HashSet<(String, usize, usize)>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(self, title: &str, grid: Grid) -> Self {
        self.insert_sheet(title, grid);
        self
    }

    pub fn insert_sheet(&self, title: &str, grid: Grid) {
        if let Ok(mut sheets) = self.sheets.lock() {
            sheets.insert(title.to_string(), grid);
        }
    }

    pub fn sheet(&self, title: &str) -> Option<Grid> {
        self.sheets.lock().ok()?.get(title).cloned()
    }

    /// Makes writes to one cell fail from now on.
    pub fn fail_cell(&self, title: &str, row: usize, col: usize) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert((title.to_string(), row, col));
        }
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|n| *n).unwrap_or(0)
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn read_sheet(&self, title: &str) -> Result<Option<Grid>> {
        let sheets = self.sheets.lock().map_err(|_| anyhow!("store lock poisoned"))?;
        Ok(sheets.get(title).cloned())
    }

    async fn write_cell(&self, title: &str, row: usize, col: usize, value: &str) -> Result<()> {
        {
            let failing = self
                .failing
                .lock()
                .map_err(|_| anyhow!("store lock poisoned"))?;
            if failing.contains(&(title.to_string(), row, col)) {
                return Err(anyhow!("write rejected for {}", a1_sheet_cell(title, row, col)));
            }
        }
        let mut sheets = self.sheets.lock().map_err(|_| anyhow!("store lock poisoned"))?;
        let grid = sheets
            .get_mut(title)
            .ok_or_else(|| anyhow!("sheet '{}' not found", title))?;
        grid.set_cell(row, col, value);
        if let Ok(mut n) = self.writes.lock() {
            *n += 1;
        }
        Ok(())
    }
}

/// Message source with a fixed answer.
#[derive(Debug, Clone)]
pub enum StaticSource {
    Found(ReactionSet),
    NoPost,
    Unreachable(String),
}

impl StaticSource {
    pub fn reactors<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Found(ids.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl MessageSource for StaticSource {
    async fn todays_reactors(&self, _today: NaiveDate) -> Result<Option<ReactionSet>> {
        match self {
            StaticSource::Found(set) => Ok(Some(set.clone())),
            StaticSource::NoPost => Ok(None),
            StaticSource::Unreachable(reason) => Err(anyhow!("{}", reason)),
        }
    }
}

/// Keeps every published message.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every send fails.
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SummaryPublisher for RecordingPublisher {
    async fn publish(&self, text: &str) -> Result<()> {
        if self.fail {
            return Err(anyhow!("destination unavailable"));
        }
        self.messages
            .lock()
            .map_err(|_| anyhow!("publisher lock poisoned"))?
            .push(text.to_string());
        Ok(())
    }
}
