//! Command handlers.
//!
//! `App` owns the spreadsheet client, the current roster snapshot and the
//! attendance store for one command invocation.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

use rollcall_core::roster::import::members_from_csv;
use rollcall_core::utils::{mask_phone, truncate_string};
use rollcall_core::{
    check_in, AttendanceRecorder, AttendanceStore, CameraError, Config, DateKey, FetchConfig,
    KeyStore, NewMember, RosterHandle, RosterSchema, RosterSnapshot, ScanError, ScanSession,
    SheetsClient, SourceFetcher, User, VisitOutcome, WriteError,
};

use crate::scanner::LineScanner;
use crate::ConfigAction;

// ============================================================================
// Constants
// ============================================================================

/// Display width of the name column in `list`.
const NAME_WIDTH: usize = 16;

/// Display width of the address column in `list`.
const ADDRESS_WIDTH: usize = 24;

pub struct App {
    config: Config,
    fetcher: SourceFetcher<SheetsClient>,
    roster: RosterHandle,
    recorder: AttendanceRecorder,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let client = SheetsClient::new()?;
        let store = AttendanceStore::open(config.attendance_path()?)?;
        Ok(Self {
            config,
            fetcher: SourceFetcher::new(client),
            roster: RosterHandle::default(),
            recorder: AttendanceRecorder::new(Arc::new(store)),
        })
    }

    fn fetch_config(&self) -> Result<FetchConfig> {
        fetch_config(&self.config)
    }

    /// Load the roster from the sheet and install it as the current snapshot.
    async fn refresh(&self) -> Result<Arc<RosterSnapshot>> {
        let fetch_config = self.fetch_config()?;
        let snapshot = self
            .fetcher
            .fetch_roster(&fetch_config)
            .await
            .map_err(|e| anyhow!("{}\n{}", e, e.remedy()))?;
        self.roster.replace(snapshot);
        Ok(self.roster.current())
    }

    fn save_attendance(&self) -> Result<()> {
        self.recorder
            .store()
            .save()
            .context("Check-in recorded but the attendance file could not be written")
    }

    // ===== Roster =====

    pub async fn list(&self, search: Option<&str>) -> Result<()> {
        let roster = self.refresh().await?;
        let users = roster.search(search.unwrap_or(""));

        println!(
            "{} of {} members (from {}, {})",
            users.len(),
            roster.len(),
            roster.source,
            roster.age_display()
        );
        for user in users {
            print_member(user);
        }
        Ok(())
    }

    pub async fn add(&self, member: NewMember) -> Result<()> {
        if member.name.trim().is_empty() {
            bail!("A name is required");
        }
        let roster = self.refresh().await?;
        let user = roster.next_member(&self.config.schema, member);
        self.append(&[user]).await
    }

    pub async fn import(&self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let members = members_from_csv(&text);
        if members.is_empty() {
            bail!("No members found in {} (is there a 이름/성함 column?)", path.display());
        }

        let roster = self.refresh().await?;
        let users = roster.next_members(&self.config.schema, members);
        self.append(&users).await
    }

    async fn append(&self, users: &[User]) -> Result<()> {
        let fetch_config = self.fetch_config()?;
        let offset = fetch_config.range_start_column();
        let rows: Vec<Vec<String>> = users
            .iter()
            .map(|u| u.to_row(&self.config.schema, offset))
            .collect();

        match self.fetcher.source().append_rows(&fetch_config, &rows).await {
            Ok(written) => {
                info!(written, "Members registered");
                for user in users {
                    println!("Registered #{} {} (code {})", user.serial, user.name, user.identifier);
                }
                Ok(())
            }
            Err(e @ WriteError::PermissionDenied(_)) => Err(anyhow!(
                "{}\nThis key can read the sheet but not edit it. Add the member in the sheet directly, or ask the owner for edit access.",
                e
            )),
            Err(e) => Err(anyhow!("Registration failed ({}): {}", e.cause(), e)),
        }
    }

    // ===== Check-in =====

    pub async fn checkin(&self, token: &str) -> Result<()> {
        let roster = self.refresh().await?;
        let result = check_in(token, roster.users(), &self.recorder)?;
        report_check_in(&result.user, result.outcome);
        self.save_attendance()
    }

    pub async fn scan(&self) -> Result<()> {
        let roster = self.refresh().await?;
        let mut session = ScanSession::new(LineScanner::new());
        session.start()?;
        println!("Ready - scan a code or type it and press Enter (Ctrl-D to stop)");

        loop {
            let result = session
                .run_with_notice(roster.users(), &self.recorder, |notice| println!("{}", notice))
                .await;
            match result {
                Ok(check_in) => {
                    report_check_in(&check_in.user, check_in.outcome);
                    self.save_attendance()?;
                    session.reset()?;
                }
                // End of scanner input
                Err(ScanError::Camera(CameraError::Disconnected(_))) | Err(ScanError::Cancelled) => break,
                Err(e) => return Err(anyhow!("Scanner stopped: {}", e)),
            }
        }

        println!("{} checked in today", self.recorder.count_today());
        Ok(())
    }

    pub fn today(&self) -> Result<()> {
        let today = DateKey::today();
        let members = self.recorder.store().members_on(today);
        println!("{}: {} checked in", today, members.len());
        for id in members {
            println!("  {}", id);
        }
        Ok(())
    }

    pub fn prune(&self, keep_days: u32) -> Result<()> {
        let cutoff = prune_cutoff(DateKey::today().date(), keep_days)?;
        let removed = self.recorder.store().prune_before(cutoff);
        self.recorder.store().save()?;
        println!("Removed {} day(s) before {}", removed, cutoff);
        Ok(())
    }
}

/// First day kept when pruning to the last `keep_days` days.
fn prune_cutoff(today: NaiveDate, keep_days: u32) -> Result<DateKey> {
    today
        .checked_sub_signed(Duration::days(i64::from(keep_days)))
        .map(DateKey::from_date)
        .ok_or_else(|| anyhow!("--keep-days {} reaches before the earliest supported date", keep_days))
}

fn print_member(user: &User) {
    println!(
        "{:>5}  {:<10} {:<width$} {:<8} {:<15} {}",
        user.serial,
        user.identifier,
        truncate_string(&user.name, NAME_WIDTH),
        user.birthdate,
        mask_phone(&user.phone),
        truncate_string(&user.address, ADDRESS_WIDTH),
        width = NAME_WIDTH
    );
}

fn report_check_in(user: &User, outcome: VisitOutcome) {
    match outcome {
        VisitOutcome::Recorded => println!("Checked in: {} (#{})", user.name, user.serial),
        VisitOutcome::AlreadyCheckedIn => {
            println!("Already checked in today: {} (#{})", user.name, user.serial)
        }
    }
}

fn fetch_config(config: &Config) -> Result<FetchConfig> {
    let api_key = config.sheet_id.as_deref().and_then(KeyStore::resolve);
    if api_key.is_none() {
        debug!("No access key; only the public export is available");
    }
    config.fetch_config(api_key)
}

fn require_sheet_id(config: &Config) -> Result<&str> {
    config
        .sheet_id
        .as_deref()
        .ok_or_else(|| anyhow!("No spreadsheet configured - run `rollcall config set --sheet-id <ID>`"))
}

// ===== Settings =====

fn parse_schema(name: &str) -> Result<RosterSchema> {
    match name.trim().to_ascii_lowercase().as_str() {
        "serial" => Ok(RosterSchema::Serial),
        "opaque" => Ok(RosterSchema::Opaque),
        other => bail!(
            "Unknown schema '{}' (use serial or opaque; custom column maps are edited in {})",
            other,
            Config::config_path()?.display()
        ),
    }
}

pub async fn configure(mut config: Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("config:     {}", Config::config_path()?.display());
            println!("sheet id:   {}", config.sheet_id.as_deref().unwrap_or("(not set)"));
            println!("sheet gid:  {}", config.sheet_gid);
            println!("range:      {}", config.range);
            println!("schema:     {}", config.schema);
            let has_key = config.sheet_id.as_deref().and_then(KeyStore::resolve).is_some();
            println!("access key: {}", if has_key { "stored" } else { "(none)" });
            println!("attendance: {}", config.attendance_path()?.display());
            Ok(())
        }
        ConfigAction::Set {
            sheet_id,
            gid,
            range,
            schema,
        } => {
            if let Some(id) = sheet_id {
                config.sheet_id = Some(id.trim().to_string());
            }
            if let Some(gid) = gid {
                config.sheet_gid = gid.trim().to_string();
            }
            if let Some(range) = range {
                config.range = range.trim().to_string();
            }
            if let Some(schema) = schema {
                config.schema = parse_schema(&schema)?;
            }
            config.save()?;
            println!("Saved {}", Config::config_path()?.display());
            Ok(())
        }
        ConfigAction::Check => {
            let fetch_config = fetch_config(&config)?;
            let client = SheetsClient::new()?;
            match client.validate(&fetch_config).await {
                Ok(title) => {
                    println!("Connected to \"{}\"", title);
                    Ok(())
                }
                Err(e) => {
                    warn!(error = %e, "Spreadsheet check failed");
                    Err(anyhow!("Could not reach the spreadsheet ({}): {}", e.cause(), e))
                }
            }
        }
    }
}

pub fn store_key(config: &Config) -> Result<()> {
    let sheet_id = require_sheet_id(config)?;
    let key = rpassword::prompt_password("Access key: ")?;
    let key = key.trim();
    if key.is_empty() {
        bail!("No key entered");
    }
    KeyStore::store(sheet_id, key)?;
    println!("Key stored in the system keychain");
    Ok(())
}

pub fn clear_key(config: &Config) -> Result<()> {
    let sheet_id = require_sheet_id(config)?;
    KeyStore::delete(sheet_id)?;
    println!("Key removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schema() {
        assert_eq!(parse_schema("Serial").expect("serial"), RosterSchema::Serial);
        assert_eq!(parse_schema(" opaque ").expect("opaque"), RosterSchema::Opaque);
        assert!(parse_schema("wide").is_err());
    }

    #[test]
    fn test_prune_cutoff() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).expect("date");
        let cutoff = prune_cutoff(today, 30).expect("cutoff");
        assert_eq!(cutoff.to_string(), "2024-03-01");
        assert_eq!(prune_cutoff(today, 0).expect("cutoff").date(), today);
    }

    #[test]
    fn test_prune_cutoff_out_of_range_is_an_error() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).expect("date");
        assert!(prune_cutoff(today, u32::MAX).is_err());
    }

    #[test]
    fn test_fetch_config_requires_sheet() {
        assert!(fetch_config(&Config::default()).is_err());
        assert!(require_sheet_id(&Config::default()).is_err());
    }
}
