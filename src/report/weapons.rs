use crate::catalog::{WEAPONS, WeaponStat, weapon_column};
use crate::detector::GAMES_EPSILON;
use crate::store::Snapshot;

use super::modes::Mode;
use super::table::{Cell, ReportTable, percent, whole};
use super::{Selection, interval_label};

const HEADERS: &[&str] = &[
    "Record",
    "# Games",
    "Ranked W/L",
    "Casual W/L",
    "Gun",
    "Fired",
    "Hit",
    "Kills",
    "HS",
    "Kill/Hit",
    "HS/Kill",
    "HS/Hit",
];

pub(crate) fn weapon_report(player: &str, sel: &Selection<'_>) -> ReportTable {
    let mut table = ReportTable::new(format!("Gun In-Between Stats: {player}"), HEADERS);
    let mut r0 = sel.baseline;
    for rep in &sel.reps {
        let r1 = rep.snap;
        if total_games(r0, r1) < GAMES_EPSILON {
            r0 = r1;
            continue;
        }
        table.rows.extend(section(interval_label(r0, rep), r0, r1));
        r0 = r1;
    }
    table
        .footer
        .extend(section("(Grand Total)".to_string(), sel.baseline, sel.last()));
    table
}

pub(crate) fn total_games(r0: &Snapshot, r1: &Snapshot) -> f64 {
    Mode::Ranked.games(r1) - Mode::Ranked.games(r0) + Mode::Casual.games(r1)
        - Mode::Casual.games(r0)
}

/// `w/l` text for one mode's interval.
pub(crate) fn win_loss(r0: &Snapshot, r1: &Snapshot, won: &str, lost: &str) -> String {
    format!(
        "{}/{}",
        whole(r1.get(won) - r0.get(won)),
        whole(r1.get(lost) - r0.get(lost))
    )
}

/// Interval header row, one row per weapon that hit anything, then a `(Total)` row.
fn section(label: String, r0: &Snapshot, r1: &Snapshot) -> Vec<Vec<Cell>> {
    let mut header = vec![
        Cell::Text(label),
        Cell::count(total_games(r0, r1)),
        Cell::Text(win_loss(r0, r1, "ranked_won", "ranked_lost")),
        Cell::Text(win_loss(r0, r1, "casual_won", "casual_lost")),
    ];
    header.extend((0..8).map(|_| Cell::text("-")));
    let mut rows = vec![header];

    let mut totals = [0.0; 4];
    for weapon in WEAPONS {
        let mut values = [0.0; 4];
        for (slot, stat) in WeaponStat::ALL.iter().enumerate() {
            let column = weapon_column(*stat, weapon);
            values[slot] = r1.get(&column) - r0.get(&column);
            totals[slot] += values[slot];
        }
        if values[1] < GAMES_EPSILON {
            continue;
        }
        rows.push(weapon_row(weapon.name, values));
    }
    rows.push(weapon_row("(Total)", totals));
    rows
}

fn weapon_row(name: &str, [fired, hit, kills, headshots]: [f64; 4]) -> Vec<Cell> {
    let mut row = vec![Cell::Blank; 4];
    row.extend([
        Cell::text(name),
        Cell::count(fired),
        Cell::count(hit),
        Cell::count(kills),
        Cell::count(headshots),
        Cell::Text(percent(kills, hit)),
        Cell::Text(percent(headshots, kills)),
        Cell::Text(percent(headshots, hit)),
    ]);
    row
}
