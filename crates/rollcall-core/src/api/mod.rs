//! Spreadsheet API client module.
//!
//! This module provides the `SheetsClient` for the three spreadsheet
//! endpoints the roster uses:
//!
//! - the public delimited-text export (primary roster read)
//! - the key-authenticated values API (fallback read, metadata probe)
//! - the values append endpoint (member registration)
//!
//! Failures are reported as `ApiError`, classified by `FailureCause` so
//! callers can tell access problems apart from transient network trouble.

pub mod client;
pub mod error;

pub use client::SheetsClient;
pub use error::{ApiError, FailureCause, WriteError};
