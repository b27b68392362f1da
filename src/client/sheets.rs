// Google Sheets v4 REST client backing the tabular store.
use crate::client::TabularStore;
use crate::client::auth::{ServiceAccountKey, TokenSource};
use crate::client::http::{build_client, ensure_success, join_segments};
use crate::config::Config;
use crate::model::{Grid, a1_sheet_cell, bool_cell_text};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Formatted cell values come back as strings; anything else is rendered
/// the way the sheet would show it.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => bool_cell_text(*b).to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

#[derive(Debug)]
pub struct SheetsClient {
    http: reqwest::Client,
    api_base: String,
    spreadsheet_id: String,
    token: TokenSource,
    titles: Mutex<Option<Vec<String>>>,
}

impl SheetsClient {
    pub fn new(
        api_base: &str,
        spreadsheet_id: &str,
        token: TokenSource,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            http: build_client(timeout_secs)?,
            api_base: api_base.to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            token,
            titles: Mutex::new(None),
        })
    }

    /// Client authenticated with the configured service account.
    pub fn from_config(config: &Config) -> Result<Self> {
        let key = ServiceAccountKey::from_json(&config.service_account_json()?)?;
        log::debug!("Using service account {}", key.client_email);
        Self::new(
            &config.sheets.api_base,
            &config.sheets.spreadsheet_id,
            TokenSource::service_account(key),
            config.http_timeout_secs,
        )
    }

    async fn bearer(&self) -> Result<String> {
        self.token.bearer(&self.http).await
    }

    /// Titles of every sheet in the spreadsheet, fetched once per client.
    pub async fn sheet_titles(&self) -> Result<Vec<String>> {
        let mut cached = self.titles.lock().await;
        if let Some(titles) = cached.as_ref() {
            return Ok(titles.clone());
        }

        let url = join_segments(
            &self.api_base,
            &["v4", "spreadsheets", self.spreadsheet_id.as_str()],
        )?;
        let response = self
            .http
            .get(url)
            .query(&[("fields", "sheets.properties.title")])
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .context("Spreadsheet lookup failed")?;
        let meta: SpreadsheetMeta = ensure_success(response, "Spreadsheet lookup")
            .await?
            .json()
            .await
            .context("Spreadsheet metadata was not valid JSON")?;

        let titles: Vec<String> = meta.sheets.into_iter().map(|s| s.properties.title).collect();
        log::debug!("Spreadsheet has sheets: {:?}", titles);
        *cached = Some(titles.clone());
        Ok(titles)
    }

    fn values_url(&self, range: &str) -> Result<reqwest::Url> {
        join_segments(
            &self.api_base,
            &["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range],
        )
    }
}

#[async_trait]
impl TabularStore for SheetsClient {
    async fn read_sheet(&self, title: &str) -> Result<Option<Grid>> {
        if !self.sheet_titles().await?.iter().any(|t| t == title) {
            return Ok(None);
        }

        let range = format!("'{}'", title.replace('\'', "''"));
        let response = self
            .http
            .get(self.values_url(&range)?)
            .query(&[
                ("majorDimension", "ROWS"),
                ("valueRenderOption", "FORMATTED_VALUE"),
            ])
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .with_context(|| format!("Reading sheet '{}' failed", title))?;
        let values: ValueRange = ensure_success(response, "Sheet read")
            .await?
            .json()
            .await
            .with_context(|| format!("Sheet '{}' values were not valid JSON", title))?;

        let rows = values
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        Ok(Some(Grid::new(rows)))
    }

    async fn write_cell(&self, title: &str, row: usize, col: usize, value: &str) -> Result<()> {
        let range = a1_sheet_cell(title, row, col);
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [[value]],
        });
        let response = self
            .http
            .put(self.values_url(&range)?)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(self.bearer().await?)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Writing {} failed", range))?;
        ensure_success(response, "Cell write").await?;
        Ok(())
    }
}
