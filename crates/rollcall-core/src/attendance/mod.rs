//! Day-scoped attendance records.
//!
//! This module provides:
//! - `DateKey`: a local calendar day, the unit attendance is scoped to
//! - `AttendanceStore`: the explicit, file-backed store shared by the
//!   recorder and its readers (opened at session start, flushed on `save`)
//! - `AttendanceRecorder`: idempotent once-per-day check-in recording
//!
//! Records are never pruned implicitly. `AttendanceStore::prune_before` is
//! an explicit operator action.

pub mod recorder;
pub mod store;

pub use recorder::{AttendanceRecorder, VisitOutcome};
pub use store::{AttendanceLog, AttendanceStore, DateKey};
