//! HTTP client for the spreadsheet export and values endpoints.
//!
//! This module provides the `SheetsClient` struct. Every call takes a
//! `FetchConfig` by reference; the client itself holds only the shared
//! connection pool and base URLs.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;

use super::{ApiError, WriteError};

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the public delimited-text export
const EXPORT_BASE_URL: &str = "https://docs.google.com/spreadsheets/d";

/// Base URL for the structured values API
const SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Timeout for the primary export. Short, since a fallback path exists.
const EXPORT_TIMEOUT_SECS: u64 = 5;

/// Timeout for the values API read.
const VALUES_TIMEOUT_SECS: u64 = 10;

/// Timeout for the metadata probe used to check settings.
const VALIDATE_TIMEOUT_SECS: u64 = 5;

/// Timeout for appends.
const WRITE_TIMEOUT_SECS: u64 = 15;

/// Values are interpreted as if typed into the sheet, so dates and numbers
/// get the sheet's formatting.
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    properties: SpreadsheetProperties,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    #[serde(default)]
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Deserialize)]
struct AppendUpdates {
    #[serde(rename = "updatedRows", default)]
    updated_rows: Option<usize>,
}

/// Render a values-API cell as text. Unformatted reads can return numbers
/// and booleans instead of strings.
fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// An export that answers 200 with an HTML sign-in page instead of CSV.
fn looks_like_html(body: &str) -> bool {
    let head = body.trim_start();
    let prefix: String = head.chars().take(15).collect::<String>().to_ascii_lowercase();
    prefix.starts_with("<!doctype html") || prefix.starts_with("<html")
}

/// Spreadsheet client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct SheetsClient {
    client: Client,
    export_base: String,
    api_base: String,
}

impl SheetsClient {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_urls(EXPORT_BASE_URL, SHEETS_API_BASE_URL)
    }

    /// Create a client that talks to alternate hosts (proxies, test servers).
    pub fn with_base_urls(export_base: &str, api_base: &str) -> Result<Self, ApiError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            export_base: export_base.trim_end_matches('/').to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn parse_base(base: &str, sheet_id: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(base).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest(format!("Not a base URL: {}", base)))?
            .push(sheet_id);
        Ok(url)
    }

    /// Export URL with a cache-busting timestamp so intermediaries don't
    /// serve a stale copy.
    pub fn export_url(&self, config: &FetchConfig, cache_bust: i64) -> Result<Url, ApiError> {
        let mut url = Self::parse_base(&self.export_base, &config.sheet_id)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest("Export URL cannot take a path".to_string()))?
            .push("export");
        url.query_pairs_mut()
            .append_pair("format", "csv")
            .append_pair("gid", &config.sheet_gid)
            .append_pair("t", &cache_bust.to_string());
        Ok(url)
    }

    fn values_url(&self, config: &FetchConfig, suffix: &str) -> Result<Url, ApiError> {
        let mut url = Self::parse_base(&self.api_base, &config.sheet_id)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest("Values URL cannot take a path".to_string()))?
            .push("values")
            .push(&format!("{}{}", config.range, suffix));
        Ok(url)
    }

    fn api_key(config: &FetchConfig) -> Result<&str, ApiError> {
        config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ApiError::MissingKey)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get(&self, url: Url, timeout_secs: u64) -> Result<reqwest::Response, ApiError> {
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await
            .map_err(ApiError::from_transport)?;
        Self::check_response(response).await
    }

    // ===== Roster Reads =====

    /// Fetch the sheet as delimited text (primary path)
    pub async fn fetch_export(&self, config: &FetchConfig) -> Result<String, ApiError> {
        let url = self.export_url(config, Utc::now().timestamp_millis())?;
        debug!(sheet = %config.sheet_id, gid = %config.sheet_gid, "Fetching CSV export");

        let response = self.get(url, EXPORT_TIMEOUT_SECS).await?;
        let body = response.text().await.map_err(ApiError::from_transport)?;

        if looks_like_html(&body) {
            return Err(ApiError::InvalidResponse(
                "Export returned an HTML page - the sheet is probably not shared publicly".to_string(),
            ));
        }
        Ok(body)
    }

    /// Fetch the configured range through the key-authenticated values API
    /// (fallback path)
    pub async fn fetch_values(&self, config: &FetchConfig) -> Result<Vec<Vec<String>>, ApiError> {
        let key = Self::api_key(config)?;
        let mut url = self.values_url(config, "")?;
        url.query_pairs_mut().append_pair("key", key);
        debug!(sheet = %config.sheet_id, range = %config.range, "Fetching values range");

        let response = self.get(url, VALUES_TIMEOUT_SECS).await?;
        let text = response.text().await.map_err(ApiError::from_transport)?;
        let parsed: ValueRange = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse values response: {}", e)))?;

        Ok(parsed
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    /// Probe spreadsheet metadata, returning its title. Used to confirm
    /// settings before saving them.
    pub async fn validate(&self, config: &FetchConfig) -> Result<String, ApiError> {
        let key = Self::api_key(config)?;
        let mut url = Self::parse_base(&self.api_base, &config.sheet_id)?;
        url.query_pairs_mut()
            .append_pair("key", key)
            .append_pair("fields", "properties.title");

        let response = self.get(url, VALIDATE_TIMEOUT_SECS).await?;
        let metadata: SpreadsheetMetadata = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse metadata: {}", e)))?;

        info!(title = %metadata.properties.title, "Spreadsheet reachable");
        Ok(metadata.properties.title)
    }

    // ===== Writes =====

    /// Append rows after the last row of the configured range.
    /// Returns the number of rows the sheet reports as written.
    pub async fn append_rows(
        &self,
        config: &FetchConfig,
        rows: &[Vec<String>],
    ) -> Result<usize, WriteError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let key = Self::api_key(config)?;
        let mut url = self.values_url(config, ":append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", VALUE_INPUT_OPTION)
            .append_pair("key", key);

        let body = serde_json::json!({ "values": rows });
        let response = self
            .client
            .post(url)
            .timeout(Duration::from_secs(WRITE_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await
            .map_err(ApiError::from_transport)?;
        let response = Self::check_response(response).await?;

        let written = match response.json::<AppendResponse>().await {
            Ok(parsed) => parsed
                .updates
                .and_then(|u| u.updated_rows)
                .unwrap_or(rows.len()),
            Err(e) => {
                warn!(error = %e, "Append succeeded but response was unreadable");
                rows.len()
            }
        };
        info!(rows = written, "Appended rows to sheet");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RosterSchema;

    fn config() -> FetchConfig {
        FetchConfig {
            sheet_id: "1AbC_dEf".to_string(),
            sheet_gid: "0".to_string(),
            range: "명단!A:H".to_string(),
            api_key: Some("k3y".to_string()),
            schema: RosterSchema::Serial,
        }
    }

    #[test]
    fn test_export_url_has_cache_bust() {
        let client = SheetsClient::new().expect("client");
        let url = client.export_url(&config(), 1700000000123).expect("url");
        assert_eq!(
            url.as_str(),
            "https://docs.google.com/spreadsheets/d/1AbC_dEf/export?format=csv&gid=0&t=1700000000123"
        );
    }

    #[test]
    fn test_values_url_encodes_range() {
        let client = SheetsClient::new().expect("client");
        let url = client.values_url(&config(), ":append").expect("url");
        assert!(url
            .as_str()
            .starts_with("https://sheets.googleapis.com/v4/spreadsheets/1AbC_dEf/values/"));
        assert!(url.path().ends_with("!A:H:append"));
        assert!(!url.path().contains("명단")); // percent-encoded
    }

    #[test]
    fn test_missing_key() {
        let mut cfg = config();
        cfg.api_key = Some("  ".to_string());
        assert!(matches!(SheetsClient::api_key(&cfg), Err(ApiError::MissingKey)));
        cfg.api_key = None;
        assert!(matches!(SheetsClient::api_key(&cfg), Err(ApiError::MissingKey)));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&serde_json::json!("a")), "a");
        assert_eq!(cell_text(&serde_json::json!(12)), "12");
        assert_eq!(cell_text(&serde_json::json!(true)), "true");
        assert_eq!(cell_text(&serde_json::Value::Null), "");
    }

    #[test]
    fn test_parse_value_range() {
        let json = r#"{"range":"Sheet1!A1:D3","majorDimension":"ROWS","values":[["연번","이름"],["1","김철수","450101",12]]}"#;
        let parsed: ValueRange = serde_json::from_str(json).expect("parse");
        assert_eq!(parsed.values.len(), 2);
        assert_eq!(cell_text(&parsed.values[1][3]), "12");

        let empty: ValueRange = serde_json::from_str(r#"{"range":"Sheet1!A1:D3"}"#).expect("parse");
        assert!(empty.values.is_empty());
    }

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html("  <!DOCTYPE html><html>"));
        assert!(looks_like_html("<HTML><head>"));
        assert!(!looks_like_html("연번,이름\n1,김철수"));
    }
}
