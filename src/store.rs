//! SQLite snapshot store.
//!
//! Tables hold only key columns at creation time; metric columns are added from the
//! catalog by [`ensure_catalog_columns`], which also backfills missing values with 0.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, info};

use crate::catalog::{GameMap, MetricFamily, Queue, Region, StatTable, metrics_in};
use crate::error::{StoreError, StoreResult};
use crate::timefmt;

pub type PlayerId = i64;
pub type RecordId = i64;
pub type GameId = i64;

pub const SEASONS_TABLE: &str = "seasons";

struct Migration {
    version: i64,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "players and records",
        sql: r#"
        CREATE TABLE IF NOT EXISTS players (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            remote_id TEXT NOT NULL UNIQUE,
            region TEXT NOT NULL DEFAULT 'ncsa'
        );
        CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            taken_at TEXT NOT NULL
        );
        "#,
    },
    Migration {
        version: 2,
        description: "snapshot tables",
        sql: r#"
        CREATE TABLE IF NOT EXISTS stats (
            player_id INTEGER NOT NULL,
            record_id INTEGER NOT NULL,
            PRIMARY KEY (player_id, record_id)
        );
        CREATE TABLE IF NOT EXISTS weapon_stats (
            player_id INTEGER NOT NULL,
            record_id INTEGER NOT NULL,
            PRIMARY KEY (player_id, record_id)
        );
        CREATE TABLE IF NOT EXISTS operator_stats (
            player_id INTEGER NOT NULL,
            record_id INTEGER NOT NULL,
            PRIMARY KEY (player_id, record_id)
        );
        CREATE TABLE IF NOT EXISTS seasons (
            player_id INTEGER NOT NULL,
            season INTEGER NOT NULL,
            PRIMARY KEY (player_id, season)
        );
        "#,
    },
    Migration {
        version: 3,
        description: "record time index",
        sql: "CREATE INDEX IF NOT EXISTS idx_records_taken_at ON records(taken_at);",
    },
    Migration {
        version: 4,
        description: "manual match log",
        sql: r#"
        CREATE TABLE IF NOT EXISTS games (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            record_id INTEGER NOT NULL REFERENCES records(id),
            queue TEXT,
            map TEXT,
            round_wins INTEGER,
            round_losses INTEGER,
            attack_wins INTEGER,
            attack_losses INTEGER,
            defense_wins INTEGER,
            defense_losses INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_games_record ON games(record_id);
        "#,
    },
];

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")
        .context("enable wal journal")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS schema_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )
    .context("create schema bookkeeping tables")?;

    let current = schema_version(conn)?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        conn.execute_batch(migration.sql)
            .with_context(|| format!("apply migration {}", migration.version))?;
        conn.execute(
            "INSERT INTO schema_version(version, description, applied_at) VALUES (?1, ?2, ?3)",
            params![
                migration.version,
                migration.description,
                timefmt::to_stored(timefmt::now())
            ],
        )
        .context("record migration")?;
        info!(version = migration.version, "applied schema migration: {}", migration.description);
    }

    ensure_catalog_columns(conn)?;

    let stamp = timefmt::to_stored(timefmt::now());
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta(key, value) VALUES ('install_date', ?1)",
        params![stamp],
    )
    .context("write install date")?;
    if current < latest_version() {
        conn.execute(
            "INSERT OR REPLACE INTO schema_meta(key, value) VALUES ('update_date', ?1)",
            params![stamp],
        )
        .context("write update date")?;
    }
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta(key, value) VALUES ('version', ?1)",
        params![latest_version().to_string()],
    )
    .context("write schema version")?;
    Ok(())
}

fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

pub fn schema_version(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .context("query schema version")
}

/// Adds any catalog column missing from its table and replaces stored nulls with 0.
pub fn ensure_catalog_columns(conn: &Connection) -> Result<()> {
    for table in StatTable::ALL {
        sync_columns(conn, table.name(), &table.columns())?;
    }
    let ladder = metrics_in(MetricFamily::Progress)
        .map(|def| def.column.as_str())
        .collect::<Vec<_>>();
    sync_columns(conn, SEASONS_TABLE, &ladder)?;
    Ok(())
}

fn sync_columns(conn: &Connection, table: &str, columns: &[&str]) -> Result<()> {
    let existing = table_columns(conn, table)?;
    let mut added = 0usize;
    for column in columns {
        if existing.iter().any(|c| c.as_str() == *column) {
            continue;
        }
        conn.execute(
            &format!("ALTER TABLE {table} ADD COLUMN {column} REAL NOT NULL DEFAULT 0"),
            [],
        )
        .with_context(|| format!("add column {table}.{column}"))?;
        added += 1;
    }
    if added > 0 {
        debug!(table, added, "added catalog columns");
    }

    let legacy = existing
        .iter()
        .filter(|c| columns.contains(&c.as_str()))
        .collect::<Vec<_>>();
    if !legacy.is_empty() {
        let sets = legacy
            .iter()
            .map(|c| format!("{c} = IFNULL({c}, 0)"))
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute(&format!("UPDATE {table} SET {sets}"), [])
            .with_context(|| format!("backfill nulls in {table}"))?;
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("prepare table_info for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query table_info for {table}"))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode table_info row")?);
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub remote_id: String,
    pub region: Region,
}

/// One (player, record) row, possibly joined across several snapshot tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub record_id: RecordId,
    pub taken_at: NaiveDateTime,
    pub values: HashMap<String, f64>,
}

impl Snapshot {
    /// Missing columns read as 0.
    pub fn get(&self, column: &str) -> f64 {
        self.values.get(column).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonSnapshot {
    pub season: u32,
    pub values: HashMap<String, f64>,
}

impl SeasonSnapshot {
    pub fn get(&self, column: &str) -> f64 {
        self.values.get(column).copied().unwrap_or(0.0)
    }
}

fn decode_player(row: &rusqlite::Row<'_>) -> rusqlite::Result<Player> {
    let region = row.get::<_, String>(3)?;
    let region = region
        .parse::<Region>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(err)))?;
    Ok(Player {
        id: row.get(0)?,
        name: row.get(1)?,
        remote_id: row.get(2)?,
        region,
    })
}

fn decode_time(idx: usize, raw: String) -> rusqlite::Result<NaiveDateTime> {
    timefmt::from_stored(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("bad record timestamp {raw:?}").into(),
        )
    })
}

pub fn create_player(
    conn: &Connection,
    name: &str,
    remote_id: &str,
    region: Region,
) -> StoreResult<PlayerId> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO players(name, remote_id, region) VALUES (?1, ?2, ?3)",
        params![name, remote_id, region.as_str()],
    )?;
    if inserted == 0 {
        return Err(StoreError::DuplicateIdentity(remote_id.to_string()));
    }
    Ok(conn.last_insert_rowid())
}

/// Deletes the player and its snapshot rows in one transaction.
pub fn remove_player(conn: &mut Connection, remote_id: &str) -> StoreResult<Player> {
    let tx = conn.transaction()?;
    let player = tx
        .query_row(
            "SELECT id, name, remote_id, region FROM players WHERE remote_id = ?1",
            params![remote_id],
            decode_player,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("player {remote_id}")))?;
    for table in StatTable::ALL
        .iter()
        .map(|t| t.name())
        .chain(std::iter::once(SEASONS_TABLE))
    {
        tx.execute(
            &format!("DELETE FROM {table} WHERE player_id = ?1"),
            params![player.id],
        )?;
    }
    tx.execute("DELETE FROM players WHERE id = ?1", params![player.id])?;
    tx.commit()?;
    Ok(player)
}

pub fn list_players(conn: &Connection) -> StoreResult<Vec<Player>> {
    let mut stmt = conn.prepare("SELECT id, name, remote_id, region FROM players ORDER BY id")?;
    let rows = stmt.query_map([], decode_player)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn find_player_by_name(conn: &Connection, name: &str) -> StoreResult<Option<Player>> {
    let player = conn
        .query_row(
            "SELECT id, name, remote_id, region FROM players
             WHERE name = ?1 COLLATE NOCASE ORDER BY id LIMIT 1",
            params![name],
            decode_player,
        )
        .optional()?;
    Ok(player)
}

pub fn rename_player(conn: &Connection, player_id: PlayerId, name: &str) -> StoreResult<()> {
    let updated = conn.execute(
        "UPDATE players SET name = ?1 WHERE id = ?2",
        params![name, player_id],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound(format!("player #{player_id}")));
    }
    Ok(())
}

pub fn create_record(conn: &Connection, taken_at: NaiveDateTime) -> StoreResult<RecordId> {
    conn.execute(
        "INSERT INTO records(taken_at) VALUES (?1)",
        params![timefmt::to_stored(taken_at)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn last_record_id(conn: &Connection) -> StoreResult<Option<RecordId>> {
    let id = conn.query_row("SELECT MAX(id) FROM records", [], |row| {
        row.get::<_, Option<i64>>(0)
    })?;
    Ok(id)
}

pub fn earliest_record_time(conn: &Connection) -> StoreResult<Option<NaiveDateTime>> {
    let raw = conn.query_row("SELECT MIN(taken_at) FROM records", [], |row| {
        row.get::<_, Option<String>>(0)
    })?;
    match raw {
        Some(raw) => Ok(Some(decode_time(0, raw)?)),
        None => Ok(None),
    }
}

/// Inserts one snapshot row. Values missing from `values` are written as 0.
pub fn write_snapshot(
    conn: &Connection,
    table: StatTable,
    player_id: PlayerId,
    record_id: RecordId,
    values: &HashMap<String, f64>,
) -> StoreResult<()> {
    let columns = table.columns();
    let placeholders = (1..=columns.len() + 2)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} (player_id, record_id, {}) VALUES ({placeholders})",
        table.name(),
        columns.join(", ")
    );
    let mut bound = Vec::with_capacity(columns.len() + 2);
    bound.push(Value::Integer(player_id));
    bound.push(Value::Integer(record_id));
    for column in &columns {
        bound.push(Value::Real(values.get(*column).copied().unwrap_or(0.0)));
    }

    match conn.execute(&sql, params_from_iter(bound.iter())) {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Err(StoreError::ConstraintViolation {
                table: table.name(),
                player_id,
                record_id,
            })
        }
        Err(err) => Err(err.into()),
    }
}

pub fn upsert_season_snapshot(
    conn: &Connection,
    player_id: PlayerId,
    season: u32,
    values: &HashMap<String, f64>,
) -> StoreResult<()> {
    let columns = metrics_in(MetricFamily::Progress)
        .map(|def| def.column.as_str())
        .collect::<Vec<_>>();
    let placeholders = (1..=columns.len() + 2)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT OR REPLACE INTO {SEASONS_TABLE} (player_id, season, {}) VALUES ({placeholders})",
        columns.join(", ")
    );
    let mut bound = vec![Value::Integer(player_id), Value::Integer(i64::from(season))];
    for column in &columns {
        bound.push(Value::Real(values.get(*column).copied().unwrap_or(0.0)));
    }
    conn.execute(&sql, params_from_iter(bound.iter()))?;
    Ok(())
}

pub fn season_snapshots(conn: &Connection, player_id: PlayerId) -> StoreResult<Vec<SeasonSnapshot>> {
    let columns = metrics_in(MetricFamily::Progress)
        .map(|def| def.column.as_str())
        .collect::<Vec<_>>();
    let sql = format!(
        "SELECT season, {} FROM {SEASONS_TABLE} WHERE player_id = ?1 ORDER BY season DESC",
        columns.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![player_id], |row| {
        let mut values = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            values.insert(column.to_string(), row.get::<_, f64>(idx + 1)?);
        }
        Ok(SeasonSnapshot {
            season: row.get(0)?,
            values,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Select list and join clause over `tables`, the first table being the driving one.
fn joined_select(tables: &[StatTable]) -> (Vec<&'static str>, String, String) {
    let mut columns = Vec::new();
    let mut select = Vec::new();
    let mut from = String::from("records r");
    for (idx, table) in tables.iter().enumerate() {
        if idx == 0 {
            from.push_str(&format!(" JOIN {} t0 ON t0.record_id = r.id", table.name()));
        } else {
            from.push_str(&format!(
                " JOIN {} t{idx} ON t{idx}.record_id = r.id AND t{idx}.player_id = t0.player_id",
                table.name()
            ));
        }
        for column in table.columns() {
            select.push(format!("t{idx}.{column}"));
            columns.push(column);
        }
    }
    (columns, select.join(", "), from)
}

fn decode_snapshot(
    row: &rusqlite::Row<'_>,
    columns: &[&'static str],
) -> rusqlite::Result<Snapshot> {
    let record_id = row.get::<_, i64>(0)?;
    let taken_at = decode_time(1, row.get::<_, String>(1)?)?;
    let mut values = HashMap::with_capacity(columns.len());
    for (idx, column) in columns.iter().enumerate() {
        values.insert(column.to_string(), row.get::<_, f64>(idx + 2)?);
    }
    Ok(Snapshot {
        record_id,
        taken_at,
        values,
    })
}

pub fn latest_snapshot(
    conn: &Connection,
    table: StatTable,
    player_id: PlayerId,
) -> StoreResult<Option<Snapshot>> {
    let (columns, select, from) = joined_select(&[table]);
    let sql = format!(
        "SELECT r.id, r.taken_at, {select} FROM {from}
         WHERE t0.player_id = ?1 ORDER BY r.id DESC LIMIT 1"
    );
    let snapshot = conn
        .query_row(&sql, params![player_id], |row| decode_snapshot(row, &columns))
        .optional()?;
    Ok(snapshot)
}

/// The latest snapshot at or before `start`, followed by every snapshot in
/// `[start, end]`, in chronological order and each exactly once. Rows exist only
/// for records present in every table of `tables`.
pub fn snapshots_in_range(
    conn: &Connection,
    tables: &[StatTable],
    player_id: PlayerId,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> StoreResult<Vec<Snapshot>> {
    let tables = if tables.is_empty() {
        &[StatTable::Stats][..]
    } else {
        tables
    };
    let (columns, select, from) = joined_select(tables);
    let start_raw = timefmt::to_stored(start);
    let end_raw = timefmt::to_stored(end);

    let baseline_sql = format!(
        "SELECT r.id, r.taken_at, {select} FROM {from}
         WHERE t0.player_id = ?1 AND r.taken_at <= ?2
         ORDER BY r.taken_at DESC, r.id DESC LIMIT 1"
    );
    let baseline = conn
        .query_row(&baseline_sql, params![player_id, start_raw], |row| {
            decode_snapshot(row, &columns)
        })
        .optional()?;

    let window_sql = format!(
        "SELECT r.id, r.taken_at, {select} FROM {from}
         WHERE t0.player_id = ?1 AND r.taken_at BETWEEN ?2 AND ?3
         ORDER BY r.taken_at ASC, r.id ASC"
    );
    let mut stmt = conn.prepare(&window_sql)?;
    let rows = stmt.query_map(params![player_id, start_raw, end_raw], |row| {
        decode_snapshot(row, &columns)
    })?;

    let mut out = Vec::new();
    if let Some(baseline) = baseline {
        out.push(baseline);
    }
    for row in rows {
        let snapshot = row?;
        if out.iter().any(|s| s.record_id == snapshot.record_id) {
            continue;
        }
        out.push(snapshot);
    }
    Ok(out)
}

/// Latest `stats` row of every player, strongest skill first.
pub fn latest_stats_for_all(conn: &Connection) -> StoreResult<Vec<(Player, Snapshot)>> {
    let (columns, select, _) = joined_select(&[StatTable::Stats]);
    let sql = format!(
        "SELECT p.id, p.name, p.remote_id, p.region, r.id, r.taken_at, {select}
         FROM players p
         JOIN stats t0 ON t0.player_id = p.id
         JOIN records r ON r.id = t0.record_id
         WHERE t0.record_id = (SELECT MAX(s2.record_id) FROM stats s2 WHERE s2.player_id = p.id)
         ORDER BY t0.skill_mean DESC, p.id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let player = decode_player(row)?;
        let taken_at = decode_time(5, row.get::<_, String>(5)?)?;
        let mut values = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            values.insert(column.to_string(), row.get::<_, f64>(idx + 6)?);
        }
        Ok((
            player,
            Snapshot {
                record_id: row.get(4)?,
                taken_at,
                values,
            },
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// One hand-entered match. Every field may be left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameLog {
    pub queue: Option<Queue>,
    pub map: Option<GameMap>,
    pub round_wins: Option<u32>,
    pub round_losses: Option<u32>,
    pub attack_wins: Option<u32>,
    pub attack_losses: Option<u32>,
    pub defense_wins: Option<u32>,
    pub defense_losses: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredGame {
    pub id: GameId,
    pub record_id: RecordId,
    pub taken_at: NaiveDateTime,
    pub log: GameLog,
}

/// Attaches a match to an existing record.
pub fn save_game(conn: &Connection, record_id: RecordId, game: &GameLog) -> StoreResult<GameId> {
    let known = conn
        .query_row(
            "SELECT 1 FROM records WHERE id = ?1",
            params![record_id],
            |_| Ok(()),
        )
        .optional()?;
    if known.is_none() {
        return Err(StoreError::NotFound(format!("record #{record_id}")));
    }
    conn.execute(
        "INSERT INTO games (record_id, queue, map, round_wins, round_losses,
                            attack_wins, attack_losses, defense_wins, defense_losses)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            record_id,
            game.queue.map(Queue::as_str),
            game.map.map(GameMap::as_str),
            game.round_wins,
            game.round_losses,
            game.attack_wins,
            game.attack_losses,
            game.defense_wins,
            game.defense_losses,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent `limit` matches, newest first.
pub fn recent_games(conn: &Connection, limit: usize) -> StoreResult<Vec<StoredGame>> {
    let mut stmt = conn.prepare(
        "SELECT g.id, g.record_id, r.taken_at, g.queue, g.map, g.round_wins, g.round_losses,
                g.attack_wins, g.attack_losses, g.defense_wins, g.defense_losses
         FROM games g JOIN records r ON r.id = g.record_id
         ORDER BY g.id DESC LIMIT ?1",
    )?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt.query_map(params![limit], |row| {
        let queue = row
            .get::<_, Option<String>>(3)?
            .map(|raw| raw.parse::<Queue>())
            .transpose()
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(err)))?;
        let map = row
            .get::<_, Option<String>>(4)?
            .map(|raw| raw.parse::<GameMap>())
            .transpose()
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(err)))?;
        Ok(StoredGame {
            id: row.get(0)?,
            record_id: row.get(1)?,
            taken_at: decode_time(2, row.get::<_, String>(2)?)?,
            log: GameLog {
                queue,
                map,
                round_wins: row.get(5)?,
                round_losses: row.get(6)?,
                attack_wins: row.get(7)?,
                attack_losses: row.get(8)?,
                defense_wins: row.get(9)?,
                defense_losses: row.get(10)?,
            },
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Writes a consistent copy of the database to `path`, which must not exist yet.
pub fn backup_to(conn: &Connection, path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("backup target {} already exists", path.display());
    }
    conn.execute("VACUUM INTO ?1", params![path.to_string_lossy().into_owned()])
        .with_context(|| format!("backup database to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_recorded_once() {
        let conn = open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), latest_version());
        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[test]
    fn joined_select_qualifies_columns() {
        let (columns, select, from) = joined_select(&[StatTable::Stats, StatTable::Weapons]);
        assert!(select.starts_with("t0.match_played"));
        assert!(select.contains("t1.fired_ar"));
        assert!(from.contains("t1.player_id = t0.player_id"));
        assert_eq!(
            columns.len(),
            StatTable::Stats.columns().len() + StatTable::Weapons.columns().len()
        );
    }
}
