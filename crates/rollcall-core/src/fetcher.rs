//! Roster retrieval with a single fallback.
//!
//! `SourceFetcher::fetch_roster` tries the public export first. On any
//! failure it makes exactly one attempt through the key-authenticated values
//! API. If that fails too, the call fails; no earlier roster is substituted.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiError, FailureCause, SheetsClient};
use crate::config::FetchConfig;
use crate::roster::{RosterPipeline, RosterSnapshot, SnapshotSource};

/// The two read paths a roster can come from.
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Primary path: the sheet as delimited text.
    async fn fetch_export(&self, config: &FetchConfig) -> Result<String, ApiError>;

    /// Secondary path: the configured range as rows of cells.
    async fn fetch_values(&self, config: &FetchConfig) -> Result<Vec<Vec<String>>, ApiError>;
}

#[async_trait]
impl SheetSource for SheetsClient {
    async fn fetch_export(&self, config: &FetchConfig) -> Result<String, ApiError> {
        SheetsClient::fetch_export(self, config).await
    }

    async fn fetch_values(&self, config: &FetchConfig) -> Result<Vec<Vec<String>>, ApiError> {
        SheetsClient::fetch_values(self, config).await
    }
}

/// Both read paths failed.
#[derive(Error, Debug)]
#[error("Could not load the roster. Export: {primary}. Values API: {fallback}")]
pub struct IngestionError {
    pub primary: ApiError,
    pub fallback: ApiError,
}

impl IngestionError {
    /// `Access` if either path was refused, otherwise the fallback's cause.
    pub fn cause(&self) -> FailureCause {
        if self.primary.cause() == FailureCause::Access || self.fallback.cause() == FailureCause::Access {
            FailureCause::Access
        } else {
            self.fallback.cause()
        }
    }

    /// One-line guidance for the operator.
    pub fn remedy(&self) -> &'static str {
        match self.cause() {
            FailureCause::Access => {
                "Check that the sheet is shared for viewing and that the access key is valid."
            }
            FailureCause::Transient => "Check the network connection and try again.",
            FailureCause::Data => "Check the configured range and sheet layout.",
        }
    }
}

pub struct SourceFetcher<S> {
    source: S,
}

impl<S: SheetSource> SourceFetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn fetch_roster(&self, config: &FetchConfig) -> Result<RosterSnapshot, IngestionError> {
        let pipeline = RosterPipeline::new(&config.schema);

        let primary = match self.source.fetch_export(config).await {
            Ok(body) => {
                let users = pipeline.from_export(&body);
                info!(members = users.len(), "Roster loaded from export");
                return Ok(RosterSnapshot::new(users, SnapshotSource::Export));
            }
            Err(e) => e,
        };

        warn!(error = %primary, cause = %primary.cause(), "Export failed, falling back to values API");

        match self.source.fetch_values(config).await {
            Ok(rows) => {
                let users = pipeline.from_values(rows, config.range_start_column());
                info!(members = users.len(), "Roster loaded from values API");
                Ok(RosterSnapshot::new(users, SnapshotSource::Values))
            }
            Err(fallback) => {
                warn!(error = %fallback, "Values API fallback failed");
                Err(IngestionError { primary, fallback })
            }
        }
    }
}
