//! Roster ingestion pipeline.
//!
//! Raw sheet data flows through these stages:
//!
//! 1. `parser` splits an exported text line into trimmed fields
//! 2. `validator` drops blank, header and half-edited rows
//! 3. `dedup` keeps the first row per serial and orders newest first
//!
//! `ingest::RosterPipeline` wires the stages together for both the CSV
//! export and the structured values API. The result is wrapped in a
//! `snapshot::RosterSnapshot` that is swapped wholesale on every refresh.

pub mod dedup;
pub mod import;
pub mod ingest;
pub mod parser;
pub mod snapshot;
pub mod validator;

pub use dedup::dedupe_and_order;
pub use ingest::RosterPipeline;
pub use parser::parse_line;
pub use snapshot::{RosterHandle, RosterSnapshot, SnapshotSource};
pub use validator::{RowRejection, RowValidator};
