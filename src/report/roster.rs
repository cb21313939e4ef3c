use rusqlite::Connection;

use crate::catalog::rank_name;
use crate::error::StoreResult;
use crate::store;

use super::table::{Cell, ReportTable, ratio_prec, time_to_string};

const HEADERS: &[&str] = &[
    "Player",
    "# Games",
    "Total Time Played",
    "K",
    "D",
    "K/D",
    "HS",
    "HPK",
    "W",
    "L",
    "W/L",
    "Rank",
    "Max Rank",
    "MMR",
    "Max MMR",
    "Skill",
    "Skill Std",
];

/// Latest stored snapshot of every player, strongest skill first.
pub fn compare_players(conn: &Connection) -> StoreResult<ReportTable> {
    let mut table = ReportTable::new("Player comparison", HEADERS);
    for (player, snap) in store::latest_stats_for_all(conn)? {
        let kills = snap.get("ranked_kill");
        let deaths = snap.get("ranked_death");
        let headshots = snap.get("headshots");
        let won = snap.get("ranked_won");
        let lost = snap.get("ranked_lost");
        table.rows.push(vec![
            Cell::Text(player.name),
            Cell::count(snap.get("match_played")),
            Cell::Text(time_to_string(snap.get("time_played"))),
            Cell::count(kills),
            Cell::count(deaths),
            Cell::Text(ratio_prec(kills, deaths, 4)),
            Cell::count(headshots),
            Cell::Text(ratio_prec(
                headshots,
                kills + snap.get("casual_kill"),
                4,
            )),
            Cell::count(won),
            Cell::count(lost),
            Cell::Text(ratio_prec(won, lost, 4)),
            Cell::text(rank_name(snap.get("rank"))),
            Cell::text(rank_name(snap.get("max_rank"))),
            Cell::Float(snap.get("mmr")),
            Cell::Float(snap.get("max_mmr")),
            Cell::Float(snap.get("skill_mean")),
            Cell::Float(snap.get("skill_std")),
        ]);
    }
    Ok(table)
}
