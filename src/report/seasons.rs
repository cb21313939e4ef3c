use rusqlite::Connection;

use crate::catalog::{rank_name, season_name};
use crate::detector::GAMES_EPSILON;
use crate::error::ReportError;
use crate::store::{self, Player};

use super::table::{Cell, ReportTable, ratio_prec};
use super::{ReportKind, ReportOutcome};

const HEADERS: &[&str] = &[
    "Season Name",
    "Season",
    "W",
    "L",
    "W/L",
    "Last Rank",
    "MMR",
    "Max Rank",
    "Max MMR",
    "Skill",
    "Skill-Low",
    "Skill-High",
];

/// Normal-approximation spread shown around the skill mean.
const SKILL_Z: f64 = 1.96;

pub(crate) fn season_report(conn: &Connection, player: &Player) -> Result<ReportOutcome, ReportError> {
    let seasons = store::season_snapshots(conn, player.id)?;
    let mut table = ReportTable::new(format!("Season Stats for {}", player.name), HEADERS);
    for s in &seasons {
        let wins = s.get("season_wins");
        let losses = s.get("season_losses");
        if wins + losses <= GAMES_EPSILON {
            continue;
        }
        let skill = s.get("skill_mean");
        let spread = SKILL_Z * s.get("skill_std");
        table.rows.push(vec![
            Cell::text(season_name(s.season)),
            Cell::Int(i64::from(s.season)),
            Cell::count(wins),
            Cell::count(losses),
            Cell::Text(ratio_prec(wins, losses, 4)),
            Cell::text(rank_name(s.get("rank"))),
            Cell::Float(s.get("mmr")),
            Cell::text(rank_name(s.get("max_rank"))),
            Cell::Float(s.get("max_mmr")),
            Cell::Float(skill),
            Cell::Float(skill - spread),
            Cell::Float(skill + spread),
        ]);
    }
    if table.rows.is_empty() {
        return Ok(ReportOutcome::InsufficientData {
            kind: ReportKind::Seasons,
            found: seasons.len(),
        });
    }
    Ok(ReportOutcome::Table(table))
}
