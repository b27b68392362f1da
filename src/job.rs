//! One scheduled run, start to finish.
//!
//! Order is fixed: reactions, sheets, date columns, outcomes, writes,
//! summary. Every outcome is computed before the first write. Only a
//! configuration problem ends the run with an error; everything else is
//! folded into the published summary.

use crate::apply::{ApplyReport, RunMode, apply_writes};
use crate::client::{
    DiscordClient, MessageSource, SheetsClient, SummaryPublisher, TabularStore,
};
use crate::config::Config;
use crate::dates::resolve_sheet_column;
use crate::error::{ConfigurationError, RunError};
use crate::mapping::load_mappings;
use crate::model::{Grid, ReactionSet, ReconciliationReport, SheetKind};
use crate::reconcile::{ReconcileInput, SheetInput, reconcile};
use crate::summary::{RunMeta, format_summary};
use chrono::NaiveDate;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub reconciliation: ReconciliationReport,
    pub apply: ApplyReport,
    pub mode: RunMode,
}

impl RunReport {
    /// Individuals holding TRUE today once the writes are done.
    pub fn marked_today(&self) -> usize {
        self.reconciliation
            .individuals
            .marked
            .saturating_sub(self.apply.failed_marks(SheetKind::Individuals))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunReport),
    /// The run stopped before touching the store.
    Failed { reason: String },
}

impl RunOutcome {
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Completed(report) => Some(report),
            RunOutcome::Failed { .. } => None,
        }
    }
}

async fn read_sheet<S>(store: &S, title: &str) -> Result<Option<Grid>, String>
where
    S: TabularStore + ?Sized,
{
    store
        .read_sheet(title)
        .await
        .map_err(|e| format!("Could not read sheet '{}': {:#}", title, e))
}

/// Reconciles `reactions` against the store and applies the result.
///
/// Returns `Ok(RunOutcome::Failed)` when a sheet cannot be read, and
/// `Err` when a required sheet does not exist.
pub async fn reconcile_store<S>(
    config: &Config,
    today: NaiveDate,
    reactions: &ReactionSet,
    store: &S,
) -> Result<RunOutcome, ConfigurationError>
where
    S: TabularStore + ?Sized,
{
    let sheets = &config.sheets;

    let mut grids = Vec::with_capacity(3);
    for title in [
        &sheets.tab_mapping,
        &sheets.tab_groups,
        &sheets.tab_individuals,
    ] {
        match read_sheet(store, title).await {
            Ok(grid) => grids.push(grid),
            Err(reason) => return Ok(RunOutcome::Failed { reason }),
        }
    }
    let individuals_grid = grids.pop().flatten();
    let groups_grid = grids.pop().flatten();
    let mapping_grid = grids.pop().flatten();

    let mappings = load_mappings(
        mapping_grid.as_ref(),
        &sheets.tab_mapping,
        groups_grid.as_ref(),
        &sheets.tab_groups,
        sheets.groups_header_row,
    )?;
    let individuals_grid = individuals_grid
        .ok_or_else(|| ConfigurationError::MissingSheet(sheets.tab_individuals.clone()))?;
    // load_mappings already rejected a missing Groups sheet.
    let groups_grid = groups_grid.unwrap_or_default();

    let individuals_column =
        resolve_sheet_column(&individuals_grid, sheets.individuals_header_row, today);
    let groups_column = resolve_sheet_column(&groups_grid, sheets.groups_header_row, today);
    let yesterday_column = today.pred_opt().and_then(|yesterday| {
        resolve_sheet_column(&individuals_grid, sheets.individuals_header_row, yesterday).ok()
    });

    for (title, column) in [
        (&sheets.tab_individuals, &individuals_column),
        (&sheets.tab_groups, &groups_column),
    ] {
        match column {
            Ok(col) => log::info!(
                "{}: today's column is {}",
                title,
                crate::model::column_letters(*col)
            ),
            Err(e) => log::warn!("{}: {}; its writes are skipped", title, e),
        }
    }

    let reconciliation = reconcile(&ReconcileInput {
        date: today,
        reactions,
        mappings: &mappings,
        individuals: SheetInput {
            title: &sheets.tab_individuals,
            grid: &individuals_grid,
            header_row: sheets.individuals_header_row,
            column: individuals_column,
        },
        groups: SheetInput {
            title: &sheets.tab_groups,
            grid: &groups_grid,
            header_row: sheets.groups_header_row,
            column: groups_column,
        },
        skip_labels: &config.skip_labels,
        yesterday_column,
    });

    let report = &reconciliation.report;
    log::info!(
        "Reconciled {}: {} reactors ({} unmapped), {} cell writes, {} warnings",
        today,
        report.reactions.total,
        report.reactions.unmapped,
        reconciliation.writes.len(),
        report.warnings.len()
    );
    for warning in &report.warnings {
        log::warn!("{}", warning);
    }

    let mode = RunMode::from_dry_run(config.dry_run);
    let apply = apply_writes(store, &reconciliation.writes, mode).await;
    if apply.failed() > 0 {
        log::warn!(
            "{} of {} cell writes failed",
            apply.failed(),
            apply.attempted()
        );
    }

    Ok(RunOutcome::Completed(RunReport {
        reconciliation: reconciliation.report,
        apply,
        mode,
    }))
}

/// Finds today's reactions, then reconciles the store.
pub async fn execute<M, S>(
    config: &Config,
    today: NaiveDate,
    source: &M,
    store: &S,
) -> Result<RunOutcome, ConfigurationError>
where
    M: MessageSource + ?Sized,
    S: TabularStore + ?Sized,
{
    log::info!("Looking up the tracked post for {}", today);
    let reactions = match source.todays_reactors(today).await {
        Ok(Some(reactions)) => reactions,
        Ok(None) => {
            return Ok(RunOutcome::Failed {
                reason: format!(
                    "Could not find today's post in <#{}>",
                    config.discord.track_channel_id
                ),
            });
        }
        Err(e) => {
            return Ok(RunOutcome::Failed {
                reason: format!("Could not read today's reactions: {:#}", e),
            });
        }
    };
    log::info!("Found {} reacting users", reactions.len());

    reconcile_store(config, today, &reactions, store).await
}

/// Full run: execute, then publish the summary.
///
/// The summary is published even when the run failed; a configuration
/// error is still returned afterwards so the process can exit non-zero.
pub async fn run<M, S, P>(
    config: &Config,
    today: NaiveDate,
    mut meta: RunMeta,
    source: &M,
    store: &S,
    publisher: &P,
) -> Result<RunOutcome, RunError>
where
    M: MessageSource + ?Sized,
    S: TabularStore + ?Sized,
    P: SummaryPublisher + ?Sized,
{
    let started = Instant::now();
    let result = execute(config, today, source, store).await;
    meta.elapsed_secs = started.elapsed().as_secs();

    match result {
        Ok(outcome) => {
            let text = format_summary(&outcome, &meta);
            publisher.publish(&text).await.map_err(RunError::Publish)?;
            log::info!("Summary published");
            Ok(outcome)
        }
        Err(config_error) => {
            log::error!("{}", config_error);
            let outcome = RunOutcome::Failed {
                reason: config_error.to_string(),
            };
            if let Err(e) = publisher.publish(&format_summary(&outcome, &meta)).await {
                log::error!("Failed to publish failure summary: {:#}", e);
            }
            Err(RunError::Configuration(config_error))
        }
    }
}

/// Best effort: tells the status channel the run could not start.
/// Does nothing when the token or status channel is not set.
pub async fn publish_failure(config: &Config, meta: &RunMeta, reason: &str) {
    if config.discord.token.trim().is_empty()
        || config.discord.status_channel_id.trim().is_empty()
    {
        return;
    }
    let outcome = RunOutcome::Failed {
        reason: reason.to_string(),
    };
    let text = format_summary(&outcome, meta);
    let result = match DiscordClient::publisher_from_config(config) {
        Ok(client) => client.publish(&text).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        log::error!("Failed to publish failure summary: {:#}", e);
    }
}

/// Builds the live Discord and Sheets clients. If either cannot be built,
/// the failure summary is published before the error is returned.
pub async fn connect(
    config: &Config,
    meta: &RunMeta,
) -> anyhow::Result<(DiscordClient, SheetsClient)> {
    let clients = DiscordClient::from_config(config)
        .and_then(|discord| Ok((discord, SheetsClient::from_config(config)?)));
    if let Err(e) = &clients {
        log::error!("Configuration error: {:#}", e);
        publish_failure(config, meta, &format!("{:#}", e)).await;
    }
    clients
}
