use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use siege_tracker::config::AppConfig;
use siege_tracker::store;
use siege_tracker::ubi_client::UbiClient;
use siege_tracker::writer;

#[derive(Parser)]
#[command(name = "capture_loop")]
#[command(about = "Capture snapshots of every tracked player on a fixed interval")]
#[command(version)]
struct Args {
    /// Minutes between capture cycles
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..))]
    interval_mins: u64,

    /// Stop after this many cycles (runs until interrupted when omitted)
    #[arg(long)]
    cycles: Option<u64>,

    /// SQLite database path (defaults to TRACKER_DB_PATH or the cache dir)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = Args::parse();
    let cfg = AppConfig::from_env();
    let log_level = if args.verbose {
        "debug"
    } else {
        cfg.log_level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let db_path = args.db.clone().unwrap_or_else(|| cfg.db_path.clone());
    let mut conn = store::open_db(&db_path)?;
    let mut client = UbiClient::from_config(&cfg).context("set up remote client")?;
    let pause = Duration::from_secs(args.interval_mins.saturating_mul(60));
    info!(db = %db_path.display(), interval_mins = args.interval_mins, "capture loop started");

    let mut done = 0u64;
    loop {
        match writer::capture_cycle(&mut conn, &mut client, false) {
            Ok(summary) => match summary.record_id {
                Some(record_id) => println!(
                    "record {record_id}: written={} duplicates={} failed={}",
                    summary.written(),
                    summary.duplicates(),
                    summary.failed()
                ),
                None => println!("no new games"),
            },
            Err(err) => warn!("capture cycle failed: {err:#}"),
        }
        done += 1;
        if args.cycles.is_some_and(|limit| done >= limit) {
            break;
        }
        thread::sleep(pause);
    }
    Ok(())
}
