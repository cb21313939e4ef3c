use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use siege_tracker::catalog::{GameMap, Queue, Region};
use siege_tracker::config::AppConfig;
use siege_tracker::credentials::{self, Credentials};
use siege_tracker::report::{self, ReportKind, ReportOutcome, ReportRequest, ReportStyle};
use siege_tracker::store::{self, GameLog};
use siege_tracker::timefmt;
use siege_tracker::ubi_client::UbiClient;
use siege_tracker::{export, writer};

#[derive(Parser)]
#[command(name = "siege_tracker")]
#[command(about = "Track Rainbow Six Siege statistics snapshots and report on their changes")]
#[command(version)]
struct Cli {
    /// SQLite database path (defaults to TRACKER_DB_PATH or the cache dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start tracking a player and capture a first snapshot
    AddPlayer {
        name: String,
        /// ncsa, emea or apac (detected from ranked games when omitted)
        #[arg(long)]
        region: Option<Region>,
    },

    /// Stop tracking a player and delete its snapshots
    RemovePlayer { name: String },

    /// List tracked players
    Players,

    /// Capture a snapshot of every player that played since the last one
    Capture {
        /// Capture every player regardless of activity
        #[arg(long)]
        force: bool,
    },

    /// Store the ladder standing of every season for every player
    CaptureSeasons,

    /// Pull display name changes from the remote service
    RefreshNames,

    /// Print a progress report for one player
    Report {
        player: String,
        /// ranked, casual, weapons, operators or seasons
        #[arg(long, short = 'k', default_value = "ranked")]
        kind: ReportKind,
        /// Run every report kind
        #[arg(long, conflicts_with = "kind")]
        all: bool,
        /// incremental or cumulative
        #[arg(long, short = 's', default_value = "incremental")]
        style: ReportStyle,
        /// Range start, YYYY-MM-DD[ HH:MM[:SS]] (defaults to the first record)
        #[arg(long)]
        start: Option<String>,
        /// Range end (defaults to now)
        #[arg(long)]
        end: Option<String>,
        /// Bucket width in days (0 lists every snapshot)
        #[arg(long, short = 'i', default_value_t = 0)]
        increment: u32,
        /// Time of day buckets start at, HH:MM (defaults to TRACKER_DAY_CUTOFF)
        #[arg(long)]
        cutoff: Option<String>,
        /// Also write the tables to an xlsx workbook
        #[arg(long)]
        xlsx: Option<PathBuf>,
        /// Also write the first table to a csv file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Log a match by hand (captures a fresh record unless --record is given)
    SaveGame {
        /// Attach the match to this record id
        #[arg(long)]
        record: Option<i64>,
        /// ranked or casual
        #[arg(long)]
        queue: Option<Queue>,
        #[arg(long)]
        map: Option<GameMap>,
        /// Rounds won
        #[arg(long)]
        won: Option<u32>,
        /// Rounds lost
        #[arg(long)]
        lost: Option<u32>,
        #[arg(long)]
        attack_won: Option<u32>,
        #[arg(long)]
        attack_lost: Option<u32>,
        #[arg(long)]
        defense_won: Option<u32>,
        #[arg(long)]
        defense_lost: Option<u32>,
    },

    /// List the most recently logged matches
    Games {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Compare the latest snapshot of every player
    Compare,

    /// Look up live ladder standing for two teams of players
    Peek {
        names: Vec<String>,
        /// Team (1 or 2) of each name, comma separated
        #[arg(long, value_delimiter = ',')]
        teams: Vec<u8>,
        #[arg(long, default_value = "ncsa")]
        region: Region,
    },

    /// Dump every stored snapshot to a csv file
    ExportCsv { path: PathBuf },

    /// Copy the database to a new file
    Backup { path: PathBuf },

    /// Write the account login file, encrypted with TRACKER_MASTER_PASSWORD
    EncryptCredentials {
        email: String,
        /// Account password (defaults to UBI_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },

    /// Show the schema version of the database
    Schema,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cli = Cli::parse();
    let cfg = AppConfig::from_env();

    let log_level = if cli.verbose {
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

    let db_path = cli.db.clone().unwrap_or_else(|| cfg.db_path.clone());

    match cli.command {
        Commands::AddPlayer { name, region } => {
            let mut conn = store::open_db(&db_path)?;
            let mut client = UbiClient::from_config(&cfg)?;
            let (player, summary) = writer::add_player(&mut conn, &mut client, &name, region)?;
            println!(
                "Added {} ({}) in {}; snapshots written: {}",
                player.name,
                player.remote_id,
                player.region.label(),
                summary.written()
            );
        }
        Commands::RemovePlayer { name } => {
            let mut conn = store::open_db(&db_path)?;
            let mut client = UbiClient::from_config(&cfg)?;
            let player = writer::remove_player(&mut conn, &mut client, &name)?;
            println!("Removed {} ({})", player.name, player.remote_id);
        }
        Commands::Players => {
            let conn = store::open_db(&db_path)?;
            for player in store::list_players(&conn)? {
                println!(
                    "{:>4}  {:<20} {:<8} {}",
                    player.id,
                    player.name,
                    player.region.as_str(),
                    player.remote_id
                );
            }
        }
        Commands::Capture { force } => {
            let mut conn = store::open_db(&db_path)?;
            let mut client = UbiClient::from_config(&cfg)?;
            let summary = writer::capture_cycle(&mut conn, &mut client, force)?;
            match summary.record_id {
                Some(record_id) => println!(
                    "Record {record_id}: written {}, duplicates {}, failed {}",
                    summary.written(),
                    summary.duplicates(),
                    summary.failed()
                ),
                None => println!("No new games, nothing captured"),
            }
        }
        Commands::CaptureSeasons => {
            let mut conn = store::open_db(&db_path)?;
            let mut client = UbiClient::from_config(&cfg)?;
            let rows = writer::capture_seasons(&mut conn, &mut client)?;
            println!("Season rows written: {rows}");
        }
        Commands::RefreshNames => {
            let conn = store::open_db(&db_path)?;
            let mut client = UbiClient::from_config(&cfg)?;
            let renamed = writer::refresh_names(&conn, &mut client)?;
            if renamed.is_empty() {
                println!("No name changes");
            }
            for (old, new) in renamed {
                println!("{old} -> {new}");
            }
        }
        Commands::Report {
            player,
            kind,
            all,
            style,
            start,
            end,
            increment,
            cutoff,
            xlsx,
            csv,
        } => {
            let conn = store::open_db(&db_path)?;
            let kinds = if all { ReportKind::ALL.to_vec() } else { vec![kind] };
            let mut request = ReportRequest::new(player, kind);
            request.style = style;
            request.start = start.as_deref().map(timefmt::parse_timestamp).transpose()?;
            request.end = end.as_deref().map(timefmt::parse_timestamp).transpose()?;
            request.increment_days = increment;
            request.cutoff = match cutoff.as_deref() {
                Some(raw) => timefmt::parse_cutoff(raw)?,
                None => cfg.day_cutoff,
            };
            let tables = run_reports(&conn, &request, &kinds)?;
            if let Some(path) = csv {
                let first = tables.first().ok_or_else(|| anyhow!("no report to export"))?;
                export::export_report_csv(&path, first)?;
                println!("Wrote {}", path.display());
            }
            if let Some(path) = xlsx {
                export::export_reports_xlsx(&path, &tables)?;
                println!("Wrote {}", path.display());
            }
        }
        Commands::SaveGame {
            record,
            queue,
            map,
            won,
            lost,
            attack_won,
            attack_lost,
            defense_won,
            defense_lost,
        } => {
            let mut conn = store::open_db(&db_path)?;
            let game = GameLog {
                queue,
                map,
                round_wins: won,
                round_losses: lost,
                attack_wins: attack_won,
                attack_losses: attack_lost,
                defense_wins: defense_won,
                defense_losses: defense_lost,
            };
            let (record_id, game_id) = match record {
                Some(record_id) => (record_id, store::save_game(&conn, record_id, &game)?),
                None => {
                    let mut client = UbiClient::from_config(&cfg)?;
                    writer::save_game(&mut conn, &mut client, None, &game)?
                }
            };
            println!("Saved game {game_id} on record {record_id}");
        }
        Commands::Games { limit } => {
            let conn = store::open_db(&db_path)?;
            let count = |v: Option<u32>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
            for game in store::recent_games(&conn, limit)? {
                let log = &game.log;
                println!(
                    "{:>4}  {}  {:<7} {:<18} {}-{}  atk {}-{}  def {}-{}",
                    game.id,
                    timefmt::display(game.taken_at),
                    log.queue.map_or("-", |q| q.as_str()),
                    log.map.map_or("-", |m| m.as_str()),
                    count(log.round_wins),
                    count(log.round_losses),
                    count(log.attack_wins),
                    count(log.attack_losses),
                    count(log.defense_wins),
                    count(log.defense_losses),
                );
            }
        }
        Commands::Compare => {
            let conn = store::open_db(&db_path)?;
            let table = report::roster::compare_players(&conn)?;
            println!("{table}");
        }
        Commands::Peek {
            names,
            teams,
            region,
        } => {
            let mut client = UbiClient::from_config(&cfg)?;
            let table = report::peek::peek_teams(&mut client, &names, &teams, region);
            println!("{table}");
        }
        Commands::ExportCsv { path } => {
            let conn = store::open_db(&db_path)?;
            let rows = export::export_csv(&conn, &path)?;
            println!("Exported {rows} rows to {}", path.display());
        }
        Commands::Backup { path } => {
            let conn = store::open_db(&db_path)?;
            store::backup_to(&conn, &path)?;
            println!("Backed up {} to {}", db_path.display(), path.display());
        }
        Commands::EncryptCredentials { email, password } => {
            let password = password
                .or_else(|| cfg.password.clone())
                .context("pass --password or set UBI_PASSWORD")?;
            let creds = Credentials { email, password };
            credentials::save_credentials(&cfg.credentials_path, &creds, &cfg.master_password)?;
            if cfg.master_password.is_empty() {
                println!(
                    "Wrote {} in plain text (TRACKER_MASTER_PASSWORD is empty)",
                    cfg.credentials_path.display()
                );
            } else {
                println!("Wrote {}", cfg.credentials_path.display());
            }
        }
        Commands::Schema => {
            let conn = store::open_db(&db_path)?;
            println!(
                "{}: schema version {}",
                db_path.display(),
                store::schema_version(&conn)?
            );
        }
    }
    Ok(())
}

fn run_reports(
    conn: &Connection,
    base: &ReportRequest,
    kinds: &[ReportKind],
) -> Result<Vec<report::ReportTable>> {
    let mut tables = Vec::new();
    for kind in kinds {
        let mut request = base.clone();
        request.kind = *kind;
        match report::run_report(conn, &request)
            .with_context(|| format!("{kind} report for {}", request.player))?
        {
            ReportOutcome::Table(table) => {
                println!("{table}");
                tables.push(table);
            }
            ReportOutcome::InsufficientData { kind, found } => {
                println!("Not enough snapshots for a {kind} report ({found} found)\n");
            }
        }
    }
    Ok(tables)
}
