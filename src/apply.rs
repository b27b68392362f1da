// Applies engine writes to the tabular store, or rehearses them.
use crate::client::TabularStore;
use crate::model::{CellWrite, SheetKind};
use futures::stream::{self, StreamExt};

/// Concurrent cell writes in live mode. Each write targets its own cell.
const MAX_PARALLEL_WRITES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Live,
    DryRun,
}

impl RunMode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run { Self::DryRun } else { Self::Live }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStatus {
    Written,
    /// Dry run: counts as a success, nothing was sent.
    Simulated,
    WriteFailed(String),
}

impl WriteStatus {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::WriteFailed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub write: CellWrite,
    pub status: WriteStatus,
}

/// Per-write results, in the order the writes were given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub results: Vec<WriteResult>,
}

impl ApplyReport {
    pub fn attempted(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &WriteResult> {
        self.results.iter().filter(|r| !r.status.is_success())
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    /// TRUE writes into `sheet` that did not land.
    pub fn failed_marks(&self, sheet: SheetKind) -> usize {
        self.failures()
            .filter(|r| r.write.sheet == sheet && r.write.value)
            .count()
    }
}

/// Runs every write. A failed write is recorded and the rest still run.
pub async fn apply_writes<S>(store: &S, writes: &[CellWrite], mode: RunMode) -> ApplyReport
where
    S: TabularStore + ?Sized,
{
    if mode.is_dry_run() {
        let results = writes
            .iter()
            .map(|w| {
                log::info!("[dry run] set {}", w);
                WriteResult {
                    write: w.clone(),
                    status: WriteStatus::Simulated,
                }
            })
            .collect();
        return ApplyReport { results };
    }

    let futures = writes.iter().map(|w| async move {
        let status = match store.write_cell(&w.sheet_title, w.row, w.col, w.text()).await {
            Ok(()) => {
                log::debug!("set {}", w);
                WriteStatus::Written
            }
            Err(e) => {
                log::warn!("Failed to set {}: {:#}", w, e);
                WriteStatus::WriteFailed(format!("{:#}", e))
            }
        };
        WriteResult {
            write: w.clone(),
            status,
        }
    });

    let results: Vec<WriteResult> = stream::iter(futures)
        .buffered(MAX_PARALLEL_WRITES)
        .collect()
        .await;

    ApplyReport { results }
}
