//! Polling cycle: detect, fetch, then write one transaction per player.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::catalog::{Region, StatTable, columns_from_remote};
use crate::detector::needs_snapshot;
use crate::error::{RemoteError, StoreError};
use crate::remote::{RankInfo, StatsSource};
use crate::store::{self, GameId, GameLog, Player, RecordId};
use crate::timefmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Written,
    Duplicate,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerCapture {
    pub player: Player,
    pub outcome: CaptureOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureSummary {
    /// `None` when no player needed a snapshot.
    pub record_id: Option<RecordId>,
    pub players: Vec<PlayerCapture>,
}

impl CaptureSummary {
    fn count(&self, want: impl Fn(&CaptureOutcome) -> bool) -> usize {
        self.players.iter().filter(|p| want(&p.outcome)).count()
    }

    pub fn written(&self) -> usize {
        self.count(|o| *o == CaptureOutcome::Written)
    }

    pub fn duplicates(&self) -> usize {
        self.count(|o| *o == CaptureOutcome::Duplicate)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, CaptureOutcome::Failed(_)))
    }
}

/// Captures every tracked player that changed since its last snapshot, or all of
/// them when `force` is set.
pub fn capture_cycle<S: StatsSource + ?Sized>(
    conn: &mut Connection,
    source: &mut S,
    force: bool,
) -> Result<CaptureSummary> {
    let players = store::list_players(conn).context("list tracked players")?;
    capture_players(conn, source, &players, force, timefmt::now())
}

pub fn capture_players<S: StatsSource + ?Sized>(
    conn: &mut Connection,
    source: &mut S,
    players: &[Player],
    force: bool,
    taken_at: NaiveDateTime,
) -> Result<CaptureSummary> {
    let selected = if force {
        players.to_vec()
    } else {
        let flags = needs_snapshot(conn, source, players);
        players
            .iter()
            .zip(flags)
            .filter(|(_, needed)| *needed)
            .map(|(p, _)| p.clone())
            .collect::<Vec<_>>()
    };
    if selected.is_empty() {
        info!("no player needs a snapshot");
        return Ok(CaptureSummary::default());
    }

    let record_id = store::create_record(conn, taken_at).context("create record")?;
    let ids = selected
        .iter()
        .map(|p| p.remote_id.clone())
        .collect::<Vec<_>>();
    let stats = source.fetch_stats(&ids).context("fetch stats")?;
    let operators = source
        .fetch_operator_stats(&ids)
        .context("fetch operator stats")?;
    let weapons = source
        .fetch_weapon_stats(&ids)
        .context("fetch weapon stats")?;

    let mut summary = CaptureSummary {
        record_id: Some(record_id),
        players: Vec::with_capacity(selected.len()),
    };
    for player in selected {
        let outcome = match (
            stats.get(&player.remote_id),
            operators.get(&player.remote_id),
            weapons.get(&player.remote_id),
        ) {
            (Some(stats), Some(operators), Some(weapons)) => {
                capture_one(conn, source, &player, record_id, [stats, operators, weapons])
            }
            _ => {
                let err = RemoteError::NotFound(format!("statistics for {}", player.remote_id));
                warn!(player = %player.name, "skipping player: {err}");
                CaptureOutcome::Failed(err.to_string())
            }
        };
        summary.players.push(PlayerCapture { player, outcome });
    }
    info!(
        record_id,
        written = summary.written(),
        duplicates = summary.duplicates(),
        failed = summary.failed(),
        "capture cycle finished"
    );
    Ok(summary)
}

fn capture_one<S: StatsSource + ?Sized>(
    conn: &mut Connection,
    source: &mut S,
    player: &Player,
    record_id: RecordId,
    payloads: [&HashMap<String, f64>; 3],
) -> CaptureOutcome {
    let rank = match source.fetch_rank(&player.remote_id, player.region, None) {
        Ok(rank) => rank,
        Err(err) => {
            warn!(player = %player.name, "skipping player, rank lookup failed: {err}");
            return CaptureOutcome::Failed(err.to_string());
        }
    };
    match write_player(conn, player.id, record_id, snapshot_rows(payloads, &rank)) {
        Ok(()) => CaptureOutcome::Written,
        Err(err @ StoreError::ConstraintViolation { .. }) => {
            warn!("ignoring duplicate snapshot: {err}");
            CaptureOutcome::Duplicate
        }
        Err(err) => {
            warn!(player = %player.name, "snapshot write rolled back: {err}");
            CaptureOutcome::Failed(err.to_string())
        }
    }
}

/// Absent fields of a returned player are written as 0.
fn snapshot_rows(
    [stats, operators, weapons]: [&HashMap<String, f64>; 3],
    rank: &RankInfo,
) -> Vec<(StatTable, HashMap<String, f64>)> {
    let mut general = columns_from_remote(StatTable::Stats, stats);
    general.extend(rank.progress_values());
    vec![
        (StatTable::Stats, general),
        (
            StatTable::Operators,
            columns_from_remote(StatTable::Operators, operators),
        ),
        (
            StatTable::Weapons,
            columns_from_remote(StatTable::Weapons, weapons),
        ),
    ]
}

fn write_player(
    conn: &mut Connection,
    player_id: store::PlayerId,
    record_id: RecordId,
    rows: Vec<(StatTable, HashMap<String, f64>)>,
) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    for (table, values) in rows {
        store::write_snapshot(&tx, table, player_id, record_id, &values)?;
    }
    tx.commit()?;
    Ok(())
}

/// Logs a match against `record_id`, or against a fresh forced capture when no
/// record is given.
pub fn save_game<S: StatsSource + ?Sized>(
    conn: &mut Connection,
    source: &mut S,
    record_id: Option<RecordId>,
    game: &GameLog,
) -> Result<(RecordId, GameId)> {
    let record_id = match record_id {
        Some(id) => id,
        None => match capture_cycle(conn, source, true)?.record_id {
            Some(id) => id,
            None => store::create_record(conn, timefmt::now()).context("create record")?,
        },
    };
    let game_id = store::save_game(conn, record_id, game)
        .with_context(|| format!("save game for record {record_id}"))?;
    info!(game_id, record_id, "game saved");
    Ok((record_id, game_id))
}

/// Region with the most ranked games this season. Ties keep the earlier region in
/// [`Region::ALL`].
pub fn detect_region<S: StatsSource + ?Sized>(source: &mut S, remote_id: &str) -> Region {
    let mut best = Region::Ncsa;
    let mut best_games = 0.0;
    for region in Region::ALL {
        match source.fetch_rank(remote_id, region, None) {
            Ok(rank) if rank.games() > best_games => {
                best = region;
                best_games = rank.games();
            }
            Ok(_) => {}
            Err(err) => warn!(%region, "region lookup failed: {err}"),
        }
    }
    best
}

/// Resolves and stores a new player, then captures its first snapshot.
pub fn add_player<S: StatsSource + ?Sized>(
    conn: &mut Connection,
    source: &mut S,
    name: &str,
    region: Option<Region>,
) -> Result<(Player, CaptureSummary)> {
    let remote_id = source
        .resolve_player_id(name)
        .with_context(|| format!("resolve player {name}"))?;
    let display_name = source.player_name(&remote_id).unwrap_or_else(|err| {
        warn!("keeping typed name for {remote_id}: {err}");
        name.to_string()
    });
    let region = match region {
        Some(region) => region,
        None => detect_region(source, &remote_id),
    };
    let id = store::create_player(conn, &display_name, &remote_id, region)
        .with_context(|| format!("store player {display_name}"))?;
    let player = Player {
        id,
        name: display_name,
        remote_id,
        region,
    };
    info!(player = %player.name, %region, "player added");
    let summary = capture_players(conn, source, std::slice::from_ref(&player), true, timefmt::now())?;
    Ok((player, summary))
}

/// Removes a player by local name, falling back to a remote name lookup.
pub fn remove_player<S: StatsSource + ?Sized>(
    conn: &mut Connection,
    source: &mut S,
    name: &str,
) -> Result<Player> {
    let remote_id = match store::find_player_by_name(conn, name).context("look up player")? {
        Some(player) => player.remote_id,
        None => source
            .resolve_player_id(name)
            .with_context(|| format!("resolve player {name}"))?,
    };
    let player = store::remove_player(conn, &remote_id)
        .with_context(|| format!("remove player {name}"))?;
    info!(player = %player.name, "player removed");
    Ok(player)
}

/// Pulls display names from the remote service. Returns `(old, new)` for each rename.
pub fn refresh_names<S: StatsSource + ?Sized>(
    conn: &Connection,
    source: &mut S,
) -> Result<Vec<(String, String)>> {
    let mut renamed = Vec::new();
    for player in store::list_players(conn).context("list tracked players")? {
        match source.player_name(&player.remote_id) {
            Ok(name) if name != player.name => {
                store::rename_player(conn, player.id, &name)
                    .with_context(|| format!("rename {}", player.name))?;
                info!(old = %player.name, new = %name, "player renamed");
                renamed.push((player.name, name));
            }
            Ok(_) => {}
            Err(err) => warn!(player = %player.name, "name refresh failed: {err}"),
        }
    }
    Ok(renamed)
}

/// Stores the ladder standing of every season up to the current one. Returns the
/// number of season rows written.
pub fn capture_seasons<S: StatsSource + ?Sized>(
    conn: &mut Connection,
    source: &mut S,
) -> Result<usize> {
    let players = store::list_players(conn).context("list tracked players")?;
    let Some(first) = players.first() else {
        return Ok(0);
    };
    let current = source
        .fetch_rank(&first.remote_id, first.region, None)
        .context("fetch current season")?
        .season;

    let mut written = 0usize;
    for player in &players {
        let mut ranks = Vec::with_capacity(current as usize);
        let mut failed = false;
        for season in 1..=current {
            match source.fetch_rank(&player.remote_id, player.region, Some(season)) {
                Ok(rank) => ranks.push((season, rank)),
                Err(err) => {
                    warn!(player = %player.name, season, "skipping season capture: {err}");
                    failed = true;
                    break;
                }
            }
        }
        if failed {
            continue;
        }
        let tx = conn.transaction().context("begin season transaction")?;
        for (season, rank) in &ranks {
            store::upsert_season_snapshot(&tx, player.id, *season, &rank.progress_values())
                .with_context(|| format!("store season {season} for {}", player.name))?;
        }
        tx.commit().context("commit season rows")?;
        written += ranks.len();
    }
    info!(current, written, "season ladder captured");
    Ok(written)
}
