use rusqlite::Connection;
use tracing::{debug, warn};

use crate::catalog::StatTable;
use crate::remote::StatsSource;
use crate::store::{self, Player};

/// Smallest counter growth treated as a new game.
pub const GAMES_EPSILON: f64 = 0.5;

/// One flag per player, in input order. A player needs a snapshot when nothing is
/// stored yet or when the remote match counter moved past the stored one.
/// Remote or store failures report every player as up to date.
pub fn needs_snapshot<S: StatsSource + ?Sized>(
    conn: &Connection,
    source: &mut S,
    players: &[Player],
) -> Vec<bool> {
    if players.is_empty() {
        return Vec::new();
    }
    let ids = players
        .iter()
        .map(|p| p.remote_id.clone())
        .collect::<Vec<_>>();
    let remote = match source.fetch_total_games_played(&ids) {
        Ok(remote) => remote,
        Err(err) => {
            warn!("skipping change detection, games played lookup failed: {err}");
            return vec![false; players.len()];
        }
    };

    let mut out = Vec::with_capacity(players.len());
    for player in players {
        let stored = match store::latest_snapshot(conn, StatTable::Stats, player.id) {
            Ok(stored) => stored,
            Err(err) => {
                warn!("skipping change detection, stored stats lookup failed: {err}");
                return vec![false; players.len()];
            }
        };
        let needed = match stored {
            None => true,
            Some(snapshot) => {
                let now = remote.get(&player.remote_id).copied().unwrap_or(0.0);
                now - snapshot.get("match_played") > GAMES_EPSILON
            }
        };
        debug!(player = %player.name, needed, "change detection");
        out.push(needed);
    }
    out
}
