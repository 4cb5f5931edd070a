use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Format of date keys in the store file.
const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// A calendar day in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Today's date in the local timezone.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn parse(s: &str) -> Option<Self> {
        NaiveDate::parse_from_str(s.trim(), DATE_KEY_FORMAT).ok().map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl std::fmt::Display for DateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

/// Persisted form: date key -> member identifiers in check-in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceLog {
    #[serde(default)]
    pub days: BTreeMap<String, Vec<String>>,
}

/// Attendance store with an explicit lifecycle. Writes stay in memory until
/// `save` is called. Share it behind an `Arc`; reads always see earlier writes.
#[derive(Debug)]
pub struct AttendanceStore {
    path: Option<PathBuf>,
    log: RwLock<AttendanceLog>,
    dirty: AtomicBool,
}

impl AttendanceStore {
    /// A store that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            log: RwLock::new(AttendanceLog::default()),
            dirty: AtomicBool::new(false),
        }
    }

    /// Load the store at `path`, starting empty if the file doesn't exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let log = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read attendance file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse attendance file: {}", path.display()))?
        } else {
            AttendanceLog::default()
        };
        debug!(path = %path.display(), days = log.days.len(), "Attendance store opened");

        Ok(Self {
            path: Some(path),
            log: RwLock::new(log),
            dirty: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, AttendanceLog> {
        self.log.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AttendanceLog> {
        self.log.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a member to a day's set. Returns false if already present.
    pub fn insert(&self, date: DateKey, member_id: &str) -> bool {
        let mut log = self.write();
        let members = log.days.entry(date.to_string()).or_default();
        if members.iter().any(|m| m == member_id) {
            return false;
        }
        members.push(member_id.to_string());
        self.dirty.store(true, Ordering::Release);
        true
    }

    pub fn count(&self, date: DateKey) -> usize {
        self.read().days.get(&date.to_string()).map_or(0, Vec::len)
    }

    pub fn contains(&self, date: DateKey, member_id: &str) -> bool {
        self.read()
            .days
            .get(&date.to_string())
            .is_some_and(|members| members.iter().any(|m| m == member_id))
    }

    /// Members checked in on a day, in check-in order.
    pub fn members_on(&self, date: DateKey) -> Vec<String> {
        self.read().days.get(&date.to_string()).cloned().unwrap_or_default()
    }

    /// Days with at least one record, oldest first. Unparseable keys from a
    /// hand-edited file are skipped.
    pub fn dates(&self) -> Vec<DateKey> {
        self.read().days.keys().filter_map(|k| DateKey::parse(k)).collect()
    }

    /// Drop every day before `cutoff`. Returns how many days were removed.
    pub fn prune_before(&self, cutoff: DateKey) -> usize {
        let mut log = self.write();
        let before = log.days.len();
        log.days
            .retain(|key, _| DateKey::parse(key).map_or(true, |date| date >= cutoff));
        let removed = before - log.days.len();
        if removed > 0 {
            self.dirty.store(true, Ordering::Release);
            info!(removed, cutoff = %cutoff, "Pruned attendance days");
        }
        removed
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Flush to disk. A no-op for in-memory stores and when nothing changed.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.is_dirty() {
            return Ok(());
        }

        let contents = serde_json::to_string_pretty(&*self.read())?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write attendance file: {}", path.display()))?;
        self.dirty.store(false, Ordering::Release);
        debug!(path = %path.display(), "Attendance store saved");
        Ok(())
    }
}
