//! Application configuration management.
//!
//! This module handles loading and saving the deployment configuration:
//! which spreadsheet to read, which tab and range, and the roster schema.
//!
//! Configuration is stored at `~/.config/rollcall/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::RosterSchema;

/// Application name used for config/data directory paths
const APP_NAME: &str = "rollcall";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Attendance store file name in the data directory
const ATTENDANCE_FILE: &str = "attendance.json";

const DEFAULT_SHEET_GID: &str = "0";
const DEFAULT_RANGE: &str = "A:H";

fn default_sheet_gid() -> String {
    DEFAULT_SHEET_GID.to_string()
}

fn default_range() -> String {
    DEFAULT_RANGE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub sheet_id: Option<String>,
    /// Tab id used by the CSV export.
    #[serde(default = "default_sheet_gid")]
    pub sheet_gid: String,
    /// Cell range used by the values API, e.g. `Sheet1!A:H`.
    #[serde(default = "default_range")]
    pub range: String,
    #[serde(default)]
    pub schema: RosterSchema,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sheet_id: None,
            sheet_gid: default_sheet_gid(),
            range: default_range(),
            schema: RosterSchema::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn attendance_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(ATTENDANCE_FILE))
    }

    /// Build the per-call fetch parameters. Fails if no spreadsheet is configured.
    pub fn fetch_config(&self, api_key: Option<String>) -> Result<FetchConfig> {
        let sheet_id = self
            .sheet_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("No spreadsheet configured - run `rollcall config set --sheet-id <ID>`"))?;

        Ok(FetchConfig {
            sheet_id,
            sheet_gid: self.sheet_gid.clone(),
            range: self.range.clone(),
            api_key,
            schema: self.schema.clone(),
        })
    }
}

/// Everything one roster fetch needs. Built fresh for every call; the core
/// keeps no connection state between fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub sheet_id: String,
    pub sheet_gid: String,
    pub range: String,
    pub api_key: Option<String>,
    pub schema: RosterSchema,
}

impl FetchConfig {
    /// Zero-based column index the configured range starts at.
    pub fn range_start_column(&self) -> usize {
        range_start_column(&self.range)
    }
}

/// Longest column reference a sheet allows (`ZZZ`).
const MAX_COLUMN_LETTERS: usize = 3;

/// Zero-based index of the first column in an A1-notation range.
/// `"Sheet1!B:I"` -> 1, `"A:H"` -> 0, `"AA2:AC"` -> 26. A bare tab name
/// covers the whole sheet and starts at column A.
pub fn range_start_column(range: &str) -> usize {
    if !range.contains('!') && !range.contains(':') {
        return 0;
    }
    let cells = range.rsplit('!').next().unwrap_or(range);
    let start = cells.split(':').next().unwrap_or(cells);

    let letters: Vec<u32> = start
        .trim()
        .trim_start_matches('$')
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .map(|c| u32::from(c.to_ascii_uppercase()) - u32::from('A') + 1)
        .collect();

    if letters.is_empty() || letters.len() > MAX_COLUMN_LETTERS {
        return 0;
    }
    let number = letters.iter().fold(0usize, |acc, &d| acc * 26 + d as usize);
    number - 1
}
