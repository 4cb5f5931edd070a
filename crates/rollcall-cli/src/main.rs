//! rollcall - roster listing and QR check-in from the command line.
//!
//! The roster is read from a shared spreadsheet on every command that needs
//! it; attendance is kept locally, one set of members per day.

mod app;
mod scanner;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use rollcall_core::{Config, NewMember};

// ============================================================================
// Command Line
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "rollcall", version, about = "Member roster and daily check-in")]
struct Cli {
    /// Also write logs to a daily rotating file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and print the roster
    List {
        /// Only members whose name, phone or code contains this text
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Check a member in for today by code, serial or phone digits
    Checkin { token: String },
    /// Read codes from a keyboard-wedge scanner (one per line) until EOF
    Scan,
    /// Show today's check-ins
    Today,
    /// Register a new member in the sheet
    Add(AddArgs),
    /// Register every member in a header-labelled CSV file
    Import { file: PathBuf },
    /// Manage the local attendance log
    Attendance {
        #[command(subcommand)]
        action: AttendanceAction,
    },
    /// Show or change spreadsheet settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage the values API access key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    birthdate: String,
    #[arg(long, default_value = "")]
    gender: String,
    #[arg(long, default_value = "")]
    district: String,
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    category: String,
}

impl From<AddArgs> for NewMember {
    fn from(args: AddArgs) -> Self {
        NewMember {
            name: args.name,
            birthdate: args.birthdate,
            gender: args.gender,
            district: args.district,
            address: args.address,
            phone: args.phone,
            category: args.category,
        }
    }
}

#[derive(Subcommand, Debug)]
enum AttendanceAction {
    /// Forget check-ins older than N days
    Prune {
        #[arg(long)]
        keep_days: u32,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    Show,
    Set {
        #[arg(long)]
        sheet_id: Option<String>,
        /// Tab id for the CSV export
        #[arg(long)]
        gid: Option<String>,
        /// Values API range, e.g. `Sheet1!A:H`
        #[arg(long)]
        range: Option<String>,
        /// Column layout: `serial` or `opaque`
        #[arg(long)]
        schema: Option<String>,
    },
    /// Confirm the spreadsheet is reachable with the stored key
    Check,
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    /// Prompt for the key and store it in the OS keychain
    Set,
    Clear,
}

// ============================================================================
// Logging
// ============================================================================

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=rollcall_core=debug).
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "rollcall.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    // Keep the guard alive so buffered file logs are flushed on exit
    let _guard = init_tracing(cli.log_dir.as_ref());
    info!("rollcall starting");

    let config = Config::load()?;

    match cli.command {
        Command::Config { action } => app::configure(config, action).await,
        Command::Key { action: KeyAction::Set } => app::store_key(&config),
        Command::Key { action: KeyAction::Clear } => app::clear_key(&config),
        Command::List { search } => App::new(config)?.list(search.as_deref()).await,
        Command::Checkin { token } => App::new(config)?.checkin(&token).await,
        Command::Scan => App::new(config)?.scan().await,
        Command::Today => App::new(config)?.today(),
        Command::Add(args) => App::new(config)?.add(args.into()).await,
        Command::Import { file } => App::new(config)?.import(&file).await,
        Command::Attendance {
            action: AttendanceAction::Prune { keep_days },
        } => App::new(config)?.prune(keep_days),
    }
}
