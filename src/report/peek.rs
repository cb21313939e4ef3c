use std::collections::HashMap;

use tracing::warn;

use crate::catalog::{OperatorStat, Region, Side, metric_by_column, rank_name, sorted_operators};
use crate::remote::{RankInfo, StatMap, StatsSource};

use super::table::{Cell, ReportTable, per};

const HEADERS: &[&str] = &[
    "Player", "Team", "MMR", "Std", "Rank", "Season-W", "Season-L", "Atk", "WL", "KD", "Def",
    "WL", "KD",
];

#[derive(Debug, Clone, PartialEq)]
struct FavouriteOperator {
    name: &'static str,
    time: f64,
    win_loss: f64,
    kill_death: f64,
}

struct PeekEntry<'a> {
    name: &'a str,
    team: u8,
    remote_id: String,
    rank: RankInfo,
}

/// Live lookup of `names` split into teams 1 and 2. `teams[i]` is the team of
/// `names[i]`; missing entries default to team 1. Names that cannot be resolved
/// are skipped. Operator stats for every resolved player come from one call.
pub fn peek_teams<S: StatsSource + ?Sized>(
    source: &mut S,
    names: &[String],
    teams: &[u8],
    region: Region,
) -> ReportTable {
    let entries = names
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            let team = teams.get(idx).copied().unwrap_or(1);
            lookup(source, name, team, region)
        })
        .collect::<Vec<_>>();
    let ids = entries
        .iter()
        .map(|e| e.remote_id.clone())
        .collect::<Vec<_>>();
    let operators = if ids.is_empty() {
        StatMap::new()
    } else {
        source.fetch_operator_stats(&ids).unwrap_or_else(|err| {
            warn!("peek has no operator stats: {err}");
            StatMap::new()
        })
    };

    let empty = HashMap::new();
    let mut table = ReportTable::new("Team peek", HEADERS);
    for team in [1u8, 2] {
        let mut team_mmr = 0.0;
        for entry in entries.iter().filter(|e| e.team == team) {
            team_mmr += entry.rank.mmr;
            let payload = operators.get(&entry.remote_id).unwrap_or(&empty);
            table.rows.push(peek_row(entry, payload));
        }
        let mut total = vec![
            Cell::Text(format!("(Team {team} Total)")),
            Cell::Int(i64::from(team)),
            Cell::Float(team_mmr),
        ];
        total.extend((0..10).map(|_| Cell::text("-")));
        table.footer.push(total);
    }
    table
}

fn lookup<'a, S: StatsSource + ?Sized>(
    source: &mut S,
    name: &'a str,
    team: u8,
    region: Region,
) -> Option<PeekEntry<'a>> {
    let found = source
        .resolve_player_id(name)
        .and_then(|remote_id| Ok((source.fetch_rank(&remote_id, region, None)?, remote_id)));
    match found {
        Ok((rank, remote_id)) => Some(PeekEntry {
            name,
            team,
            remote_id,
            rank,
        }),
        Err(err) => {
            warn!("peek skipping {name}: {err}");
            None
        }
    }
}

fn peek_row(entry: &PeekEntry<'_>, payload: &HashMap<String, f64>) -> Vec<Cell> {
    let rank = &entry.rank;
    let mut row = vec![
        Cell::text(entry.name),
        Cell::Int(i64::from(entry.team)),
        Cell::Float(rank.mmr),
        Cell::Float(rank.skill_stdev),
        Cell::text(rank_name(rank.rank)),
        Cell::count(rank.wins),
        Cell::count(rank.losses),
    ];
    for side in [Side::Attack, Side::Defense] {
        match favourite_operator(payload, side) {
            Some(op) => row.extend([
                Cell::text(op.name),
                Cell::Text(format!("{:.2}", op.win_loss)),
                Cell::Text(format!("{:.2}", op.kill_death)),
            ]),
            None => row.extend([Cell::text("-"), Cell::text("-"), Cell::text("-")]),
        }
    }
    row
}

/// Most played operator of `side`; later operators in report order win ties.
fn favourite_operator(payload: &HashMap<String, f64>, side: Side) -> Option<FavouriteOperator> {
    if payload.is_empty() {
        return None;
    }
    let value = |column: String| {
        metric_by_column(&column)
            .and_then(|def| payload.get(&def.remote_key))
            .copied()
            .unwrap_or(0.0)
    };
    let mut best: Option<FavouriteOperator> = None;
    for op in sorted_operators().into_iter().filter(|op| op.side == side) {
        let time = value(op.column(OperatorStat::TimePlayed));
        if best.as_ref().is_some_and(|b| time < b.time) {
            continue;
        }
        best = Some(FavouriteOperator {
            name: op.name,
            time,
            win_loss: per(
                value(op.column(OperatorStat::RoundsWon)),
                value(op.column(OperatorStat::RoundsLost)),
            ),
            kill_death: per(
                value(op.column(OperatorStat::Kills)),
                value(op.column(OperatorStat::Deaths)),
            ),
        });
    }
    best
}
