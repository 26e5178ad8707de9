//! Headless sync daemon for the duka POS.
//!
//! Opens the local transaction queue, starts the sync agent against the
//! configured ledger, and keeps draining until Ctrl-C. Runs alongside any
//! process that appends to the same database.
//!
//! ```text
//! Usage: syncd [OPTIONS]
//!
//! Options:
//!   -c, --config <PATH>   Config file (default: platform config dir/sync.toml)
//!   -d, --db <PATH>       Database file (default: platform data dir/duka.db)
//!   -h, --help            Show this help
//!
//! Environment:
//!   DUKA_DB_PATH          Overrides the database path
//!   DUKA_LEDGER_URL       Overrides [ledger] url (see SyncConfig for the rest)
//!   RUST_LOG              Log filter (default: info)
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use duka_db::{Database, DbConfig};
use duka_sync::{SyncAgent, SyncConfig, SyncError, SyncResult};

const STATUS_EVERY: Duration = Duration::from_secs(60);

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

struct Args {
    config_path: Option<PathBuf>,
    db_path: Option<PathBuf>,
}

fn print_usage() {
    println!("syncd: ledger synchronization daemon for the duka POS");
    println!();
    println!("Usage: syncd [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>   Config file (default: platform config dir/sync.toml)");
    println!("  -d, --db <PATH>       Database file (default: platform data dir/duka.db)");
    println!("  -h, --help            Show this help");
    println!();
    println!("Environment:");
    println!("  DUKA_DB_PATH          Overrides the database path");
    println!("  DUKA_LEDGER_URL       Overrides [ledger] url");
    println!("  RUST_LOG              Log filter (default: info)");
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config_path: None,
        db_path: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = iter.next().ok_or("--config needs a path")?;
                args.config_path = Some(PathBuf::from(value));
            }
            "--db" | "-d" => {
                let value = iter.next().ok_or("--db needs a path")?;
                args.db_path = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(args)
}

/// Database location: --db flag, then DUKA_DB_PATH, then the platform
/// data directory.
fn resolve_db_path(flag: Option<PathBuf>) -> SyncResult<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Ok(path) = std::env::var("DUKA_DB_PATH") {
        return Ok(PathBuf::from(path));
    }

    let dirs = ProjectDirs::from("com", "duka", "pos")
        .ok_or_else(|| SyncError::Storage("Cannot determine platform data directory".into()))?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .map_err(|e| SyncError::Storage(format!("Cannot create {}: {e}", data_dir.display())))?;

    Ok(data_dir.join("duka.db"))
}

async fn report_status(agent: &SyncAgent) {
    match agent.status().await {
        Ok(status) => {
            info!(
                link = %status.link,
                pending = status.pending,
                last_success = ?status.last_success_at,
                last_error = ?status.last_error,
                "Queue status"
            );
        }
        Err(e) => warn!(error = %e, "Could not read queue status"),
    }
}

async fn run(args: Args) -> SyncResult<()> {
    let config = SyncConfig::load(args.config_path)?;

    let db_path = resolve_db_path(args.db_path)?;
    info!(path = %db_path.display(), "Opening transaction queue");
    let db = Arc::new(Database::new(DbConfig::new(&db_path)).await?);

    let agent = SyncAgent::start(config, db)?;
    report_status(&agent).await;

    let mut ticker = tokio::time::interval(STATUS_EVERY);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                report_status(&agent).await;
            }

            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "Signal handler failed, shutting down");
                } else {
                    info!("Ctrl-C received, shutting down");
                }
                break;
            }
        }
    }

    report_status(&agent).await;
    agent.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("syncd: {e}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args).await {
        error!(error = %e, "syncd exiting with failure");
        std::process::exit(1);
    }
}
