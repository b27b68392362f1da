// File: ./src/config.rs
// Handles configuration loading, environment overrides, validation and defaults.
use crate::context::AppContext;
use crate::error::ConfigurationError;
use anyhow::{Context, Error, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_DISCORD_API: &str = "https://discord.com/api/v10";
pub const DEFAULT_SHEETS_API: &str = "https://sheets.googleapis.com";
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";

fn default_check_name() -> String {
    "Scheduled Check".to_string()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_emoji() -> String {
    "✅".to_string()
}

fn default_lookback() -> u32 {
    50
}

fn default_discord_api() -> String {
    DEFAULT_DISCORD_API.to_string()
}

fn default_sheets_api() -> String {
    DEFAULT_SHEETS_API.to_string()
}

fn default_tab_individuals() -> String {
    "Individuals".to_string()
}

fn default_tab_groups() -> String {
    "Groups".to_string()
}

fn default_tab_mapping() -> String {
    "Member Mapping".to_string()
}

fn default_header_row() -> usize {
    1
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DiscordConfig {
    /// Bot token. Usually supplied through DISCORD_TOKEN instead.
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub track_channel_id: String,
    #[serde(default)]
    pub status_channel_id: String,
    #[serde(default)]
    pub require_author_id: String,
    #[serde(default)]
    pub title_match: String,
    #[serde(default = "default_emoji")]
    pub track_emoji: String,
    #[serde(default = "default_lookback")]
    pub lookback_messages: u32,
    #[serde(default = "default_discord_api")]
    pub api_base: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            track_channel_id: String::new(),
            status_channel_id: String::new(),
            require_author_id: String::new(),
            title_match: String::new(),
            track_emoji: default_emoji(),
            lookback_messages: default_lookback(),
            api_base: default_discord_api(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SheetsConfig {
    #[serde(default)]
    pub spreadsheet_id: String,
    /// Service account key JSON. Usually supplied through GOOGLE_CREDS_JSON.
    #[serde(default)]
    pub credentials_json: String,
    /// Alternative to `credentials_json`: path to the key file.
    #[serde(default)]
    pub credentials_path: String,
    #[serde(default = "default_tab_individuals")]
    pub tab_individuals: String,
    #[serde(default = "default_tab_groups")]
    pub tab_groups: String,
    #[serde(default = "default_tab_mapping")]
    pub tab_mapping: String,
    #[serde(default = "default_header_row")]
    pub individuals_header_row: usize,
    #[serde(default = "default_header_row")]
    pub groups_header_row: usize,
    #[serde(default = "default_sheets_api")]
    pub api_base: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            credentials_json: String::new(),
            credentials_path: String::new(),
            tab_individuals: default_tab_individuals(),
            tab_groups: default_tab_groups(),
            tab_mapping: default_tab_mapping(),
            individuals_header_row: default_header_row(),
            groups_header_row: default_header_row(),
            api_base: default_sheets_api(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_check_name")]
    pub check_name: String,
    /// IANA zone that decides which calendar day "today" is.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    /// Individuals column-A values that are headings, not people.
    #[serde(default)]
    pub skip_labels: Vec<String>,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dry_run: false,
            check_name: default_check_name(),
            timezone: default_timezone(),
            http_timeout_secs: default_http_timeout(),
            skip_labels: Vec::new(),
            discord: DiscordConfig::default(),
            sheets: SheetsConfig::default(),
        }
    }
}

impl Config {
    /// Load the configuration from the context's config file.
    /// Returns a contextualized error if reading or parsing fails.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        // Explicitly detect missing file so the CLI can point at `init`.
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found"));
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Helper to detect whether an anyhow::Error indicates that the config file was missing.
    pub fn is_missing_config_error(err: &Error) -> bool {
        if err.to_string().contains("Config file not found") {
            return true;
        }

        // Walk the error chain and look for an underlying IO NotFound.
        for cause in err.chain() {
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>()
                && io_err.kind() == std::io::ErrorKind::NotFound
            {
                return true;
            }
        }

        false
    }

    /// Overlay secrets and toggles from environment-style variables.
    ///
    /// `lookup` is usually `std::env::var(..).ok()`; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(token) = non_empty("DISCORD_TOKEN").or_else(|| non_empty("DISCORD_BOT_TOKEN"))
        {
            self.discord.token = token;
        }
        if let Some(creds) = non_empty("GOOGLE_CREDS_JSON") {
            self.sheets.credentials_json = creds;
        }
        if let Some(flag) = non_empty("DRY_RUN") {
            self.dry_run = flag == "1" || flag.eq_ignore_ascii_case("true");
        }
        if let Some(name) = non_empty("CHECK_NAME") {
            self.check_name = name;
        }
        if let Some(zone) = non_empty("TIMEZONE") {
            self.timezone = zone;
        }
    }

    pub fn apply_process_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Checks that every setting a live run needs is present.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let required: [(&'static str, &str); 6] = [
            ("discord.token", self.discord.token.as_str()),
            ("discord.track_channel_id", self.discord.track_channel_id.as_str()),
            ("discord.status_channel_id", self.discord.status_channel_id.as_str()),
            ("discord.require_author_id", self.discord.require_author_id.as_str()),
            ("discord.title_match", self.discord.title_match.as_str()),
            ("sheets.spreadsheet_id", self.sheets.spreadsheet_id.as_str()),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigurationError::MissingSetting(name));
            }
        }

        for (name, value) in [
            ("discord.track_channel_id", &self.discord.track_channel_id),
            ("discord.status_channel_id", &self.discord.status_channel_id),
            ("discord.require_author_id", &self.discord.require_author_id),
        ] {
            if value.trim().parse::<u64>().is_err() {
                return Err(ConfigurationError::InvalidSetting {
                    name,
                    reason: format!("'{}' is not a numeric id", value),
                });
            }
        }

        if self.sheets.credentials_json.trim().is_empty()
            && self.sheets.credentials_path.trim().is_empty()
        {
            return Err(ConfigurationError::MissingSetting("sheets.credentials_json"));
        }

        if self.sheets.individuals_header_row == 0 || self.sheets.groups_header_row == 0 {
            return Err(ConfigurationError::InvalidSetting {
                name: "sheets.*_header_row",
                reason: "header rows are 1-based".to_string(),
            });
        }

        self.tz()?;

        if self.discord.lookback_messages == 0 {
            return Err(ConfigurationError::InvalidSetting {
                name: "discord.lookback_messages",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.http_timeout_secs == 0 {
            return Err(ConfigurationError::InvalidSetting {
                name: "http_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// The configured zone, parsed.
    pub fn tz(&self) -> Result<Tz, ConfigurationError> {
        self.timezone
            .trim()
            .parse::<Tz>()
            .map_err(|_| ConfigurationError::InvalidSetting {
                name: "timezone",
                reason: format!("'{}' is not an IANA time zone", self.timezone),
            })
    }

    /// Service account key JSON, from the inline setting or the key file.
    pub fn service_account_json(&self) -> Result<String> {
        if !self.sheets.credentials_json.trim().is_empty() {
            return Ok(self.sheets.credentials_json.clone());
        }
        let path = self.sheets.credentials_path.trim();
        if path.is_empty() {
            return Err(ConfigurationError::MissingSetting("sheets.credentials_json").into());
        }
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read service account key '{}'", path))
    }

    /// Save configuration using an explicit context.
    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_config_file_path()?;
        let toml_str = toml::to_string_pretty(self)?;
        atomic_write(&path, toml_str)
    }

    /// Get the path string using an explicit context.
    pub fn get_path_string(ctx: &dyn AppContext) -> Result<String> {
        let path = ctx.get_config_file_path()?;
        Ok(path.to_string_lossy().to_string())
    }
}

/// Atomic write: Write to .tmp file then rename
fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
    let path = path.as_ref();
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)?;
    fs::rename(tmp_path, path)?;
    Ok(())
}
