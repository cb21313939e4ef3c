use crate::catalog::{OperatorStat, sorted_operators};
use crate::detector::GAMES_EPSILON;
use crate::store::Snapshot;

use super::table::{Cell, ReportTable, percent, ratio, time_to_string};
use super::weapons::total_games;
use super::{Selection, interval_label};

const HEADERS: &[&str] = &[
    "Record",
    "# Games",
    "Ranked W",
    "Ranked L",
    "Casual W",
    "Casual L",
    "Side",
    "Operator",
    "Round W",
    "Round L",
    "W/L",
    "K",
    "D",
    "K/D",
    "Survival%",
    "Time Played",
];

pub(crate) fn operator_report(player: &str, sel: &Selection<'_>) -> ReportTable {
    let mut table = ReportTable::new(format!("Operator In-Between Stats: {player}"), HEADERS);
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

#[derive(Default, Clone, Copy)]
struct RoundLine {
    time: f64,
    won: f64,
    lost: f64,
    kills: f64,
    deaths: f64,
}

impl RoundLine {
    fn rounds(&self) -> f64 {
        self.won + self.lost
    }

    fn add(&mut self, other: &RoundLine) {
        self.time += other.time;
        self.won += other.won;
        self.lost += other.lost;
        self.kills += other.kills;
        self.deaths += other.deaths;
    }

    fn cells(&self) -> [Cell; 8] {
        [
            Cell::count(self.won),
            Cell::count(self.lost),
            Cell::Text(ratio(self.won, self.lost)),
            Cell::count(self.kills),
            Cell::count(self.deaths),
            Cell::Text(ratio(self.kills, self.deaths)),
            Cell::Text(percent(self.rounds() - self.deaths, self.rounds())),
            Cell::Text(time_to_string(self.time)),
        ]
    }
}

fn section(label: String, r0: &Snapshot, r1: &Snapshot) -> Vec<Vec<Cell>> {
    let delta = |column: &str| r1.get(column) - r0.get(column);
    let mut header = vec![
        Cell::Text(label),
        Cell::count(total_games(r0, r1)),
        Cell::count(delta("ranked_won")),
        Cell::count(delta("ranked_lost")),
        Cell::count(delta("casual_won")),
        Cell::count(delta("casual_lost")),
    ];
    header.extend((0..10).map(|_| Cell::text("-")));
    let mut rows = vec![header];

    let mut total = RoundLine::default();
    let mut prev_side = None;
    for op in sorted_operators() {
        let line = RoundLine {
            time: delta(&op.column(OperatorStat::TimePlayed)),
            won: delta(&op.column(OperatorStat::RoundsWon)),
            lost: delta(&op.column(OperatorStat::RoundsLost)),
            kills: delta(&op.column(OperatorStat::Kills)),
            deaths: delta(&op.column(OperatorStat::Deaths)),
        };
        total.add(&line);
        if line.rounds() < GAMES_EPSILON {
            continue;
        }
        let side = if prev_side == Some(op.side) {
            Cell::Blank
        } else {
            Cell::text(op.side.as_str())
        };
        prev_side = Some(op.side);

        let mut row = vec![Cell::Blank; 6];
        row.push(side);
        row.push(Cell::text(op.name));
        row.extend(line.cells());
        rows.push(row);
    }

    let mut row = vec![Cell::Blank; 6];
    row.push(Cell::text("(Total)"));
    row.push(Cell::text("-"));
    row.extend(total.cells());
    rows.push(row);
    rows
}
