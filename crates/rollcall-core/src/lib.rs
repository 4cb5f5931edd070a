//! rollcall-core - roster ingestion, member matching and attendance.
//!
//! The roster lives in a shared spreadsheet. `fetcher` loads it (public
//! export first, key-authenticated values API as the single fallback),
//! `roster` turns raw rows into validated, de-duplicated members, and
//! `matcher` / `checkin` / `scan` resolve a scanned or typed code to a
//! member and record the day's visit in `attendance`.

pub mod api;
pub mod attendance;
pub mod checkin;
pub mod config;
pub mod credentials;
pub mod fetcher;
pub mod matcher;
pub mod models;
pub mod roster;
pub mod scan;
pub mod utils;

pub use api::{ApiError, FailureCause, SheetsClient, WriteError};
pub use attendance::{AttendanceRecorder, AttendanceStore, DateKey, VisitOutcome};
pub use checkin::{check_in, CheckIn, UnrecognizedToken};
pub use config::{Config, FetchConfig};
pub use credentials::KeyStore;
pub use fetcher::{IngestionError, SheetSource, SourceFetcher};
pub use matcher::{match_token, MatchRule};
pub use models::{ColumnMap, NewMember, RosterSchema, User};
pub use roster::{RosterHandle, RosterSnapshot, SnapshotSource};
pub use scan::{CameraError, CaptureDevice, FrameStream, ScanError, ScanSession, ScanState, ScanStep, ScanTiming};
