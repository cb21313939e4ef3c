use crate::catalog::rank_name;
use crate::detector::GAMES_EPSILON;
use crate::store::Snapshot;

use super::table::{Cell, ReportTable, flagged, per, percent, ratio, ratio_prec, whole};
use super::{Selection, interval_label};
use crate::timefmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Ranked,
    Casual,
}

impl Mode {
    fn label(self) -> &'static str {
        match self {
            Mode::Ranked => "Ranked",
            Mode::Casual => "Casual",
        }
    }

    fn other(self) -> Mode {
        match self {
            Mode::Ranked => Mode::Casual,
            Mode::Casual => Mode::Ranked,
        }
    }

    fn won(self) -> &'static str {
        match self {
            Mode::Ranked => "ranked_won",
            Mode::Casual => "casual_won",
        }
    }

    fn lost(self) -> &'static str {
        match self {
            Mode::Ranked => "ranked_lost",
            Mode::Casual => "casual_lost",
        }
    }

    fn kill(self) -> &'static str {
        match self {
            Mode::Ranked => "ranked_kill",
            Mode::Casual => "casual_kill",
        }
    }

    fn death(self) -> &'static str {
        match self {
            Mode::Ranked => "ranked_death",
            Mode::Casual => "casual_death",
        }
    }

    pub fn games(self, snap: &Snapshot) -> f64 {
        snap.get(self.won()) + snap.get(self.lost())
    }
}

const INCREMENTAL_HEADERS: &[&str] = &[
    "Record", "# Games", "K", "A", "D", "K/D", "HS", "H/K", "W", "L", "W/L",
];
const LADDER_DELTA_HEADERS: &[&str] = &["MMR", "Skill", "StDev"];

const CUMULATIVE_HEADERS: &[&str] = &[
    "Record", "# Games", "K", "D", "K/D", "KPG", "Assists", "APG", "Headshots", "HPG", "W", "L",
    "W/L",
];
const LADDER_CUMULATIVE_HEADERS: &[&str] = &[
    "Season W",
    "Season L",
    "Season W/L",
    "MMR",
    "Rank",
    "Skill",
    "Skill SD",
];

fn headers(base: &[&'static str], ladder: &[&'static str], mode: Mode) -> Vec<&'static str> {
    let mut out = base.to_vec();
    if mode == Mode::Ranked {
        out.extend_from_slice(ladder);
    }
    out
}

/// One row per interval with games in `mode`, then a `(Total)` footer.
pub(crate) fn incremental(mode: Mode, player: &str, sel: &Selection<'_>) -> ReportTable {
    let mut table = ReportTable::new(
        format!("{} In-Between Progress: {player}", mode.label()),
        &headers(INCREMENTAL_HEADERS, LADDER_DELTA_HEADERS, mode),
    );

    let mut r0 = sel.baseline;
    let mut assists = 0.0;
    let mut headshots = 0.0;
    let mut any_flag = false;
    for rep in &sel.reps {
        let r1 = rep.snap;
        let games = mode.games(r1) - mode.games(r0);
        if games < GAMES_EPSILON {
            r0 = r1;
            continue;
        }
        let flag = mode.other().games(r1) - mode.other().games(r0) > GAMES_EPSILON;
        let delta = |column: &str| r1.get(column) - r0.get(column);

        let mut row = delta_row(
            mode,
            interval_label(r0, rep),
            games,
            &delta,
            delta("assists"),
            delta("headshots"),
            flag,
        );
        if mode == Mode::Ranked {
            row.extend(ladder_delta(&delta));
        }
        table.rows.push(row);

        assists += delta("assists");
        headshots += delta("headshots");
        any_flag |= flag;
        r0 = r1;
    }

    let (p0, p1) = (sel.baseline, sel.last());
    let delta = |column: &str| p1.get(column) - p0.get(column);
    let mut total = delta_row(
        mode,
        "(Total)".to_string(),
        mode.games(p1) - mode.games(p0),
        &delta,
        assists,
        headshots,
        any_flag,
    );
    if mode == Mode::Ranked {
        total.extend(ladder_delta(&delta));
    }
    table.footer.push(total);
    table
}

fn delta_row(
    mode: Mode,
    label: String,
    games: f64,
    delta: &dyn Fn(&str) -> f64,
    assists: f64,
    headshots: f64,
    flag: bool,
) -> Vec<Cell> {
    let kills = delta(mode.kill());
    let deaths = delta(mode.death());
    let won = delta(mode.won());
    let lost = delta(mode.lost());
    vec![
        Cell::Text(label),
        Cell::count(games),
        Cell::count(kills),
        Cell::Text(flagged(whole(assists), flag)),
        Cell::count(deaths),
        Cell::Text(ratio(kills, deaths)),
        Cell::Text(flagged(whole(headshots), flag)),
        Cell::Text(flagged(percent(headshots, kills), flag)),
        Cell::count(won),
        Cell::count(lost),
        Cell::Text(ratio(won, lost)),
    ]
}

fn ladder_delta(delta: &dyn Fn(&str) -> f64) -> Vec<Cell> {
    vec![
        Cell::Text(format!("{:.2}", delta("mmr"))),
        Cell::Text(format!("{:.2}", delta("skill_mean"))),
        Cell::Text(format!("{:.2}", delta("skill_std"))),
    ]
}

/// Lifetime values for the baseline and every later representative with new
/// games in `mode`, then a `(Diff)` footer between the first and last rows.
pub(crate) fn cumulative(mode: Mode, player: &str, sel: &Selection<'_>) -> ReportTable {
    let mut table = ReportTable::new(
        format!("{} Cumulative Progress: {player}", mode.label()),
        &headers(CUMULATIVE_HEADERS, LADDER_CUMULATIVE_HEADERS, mode),
    );

    let first = sel.baseline;
    let mut kept = vec![first];
    table.rows.push(cumulative_row(
        mode,
        timefmt::display(first.taken_at),
        first,
        false,
    ));
    let mut r0 = first;
    let mut any_flag = false;
    for rep in &sel.reps {
        let r1 = rep.snap;
        if mode.games(r1) - mode.games(r0) < GAMES_EPSILON {
            r0 = r1;
            continue;
        }
        let flag = mode.other().games(r1) - mode.other().games(r0) > GAMES_EPSILON;
        let label = match rep.bucket {
            Some(bucket) => timefmt::display_date(bucket.to),
            None => timefmt::display(r1.taken_at),
        };
        table.rows.push(cumulative_row(mode, label, r1, flag));
        kept.push(r1);
        any_flag |= flag;
        r0 = r1;
    }

    let last = kept.last().copied().unwrap_or(first);
    table.footer.push(diff_row(mode, first, last, any_flag));
    table
}

fn cumulative_row(mode: Mode, label: String, snap: &Snapshot, flag: bool) -> Vec<Cell> {
    let games = mode.games(snap);
    let kills = snap.get(mode.kill());
    let deaths = snap.get(mode.death());
    let won = snap.get(mode.won());
    let lost = snap.get(mode.lost());
    let assists = snap.get("assists");
    let headshots = snap.get("headshots");
    let mut row = vec![
        Cell::Text(label),
        Cell::count(games),
        Cell::count(kills),
        Cell::count(deaths),
        Cell::Text(ratio_prec(kills, deaths, 4)),
        Cell::Text(ratio_prec(kills, games, 4)),
        Cell::Text(flagged(whole(assists), flag)),
        Cell::Text(flagged(ratio_prec(assists, games, 4), flag)),
        Cell::Text(flagged(whole(headshots), flag)),
        Cell::Text(flagged(ratio_prec(headshots, games, 4), flag)),
        Cell::count(won),
        Cell::count(lost),
        Cell::Text(ratio_prec(won, lost, 4)),
    ];
    if mode == Mode::Ranked {
        let season_wins = snap.get("season_wins");
        let season_losses = snap.get("season_losses");
        row.extend([
            Cell::count(season_wins),
            Cell::count(season_losses),
            Cell::Text(ratio_prec(season_wins, season_losses, 4)),
            Cell::Text(format!("{:.2}", snap.get("mmr"))),
            Cell::text(rank_name(snap.get("rank"))),
            Cell::Text(format!("{:.2}", snap.get("skill_mean"))),
            Cell::Text(format!("{:.2}", snap.get("skill_std"))),
        ]);
    }
    row
}

fn diff_row(mode: Mode, p0: &Snapshot, p1: &Snapshot, flag: bool) -> Vec<Cell> {
    let delta = |column: &str| p1.get(column) - p0.get(column);
    let signed = |value: f64| format!("{value:+.4}");
    let per_diff = |num: &str, den: &dyn Fn(&Snapshot) -> f64| {
        per(p1.get(num), den(p1)) - per(p0.get(num), den(p0))
    };
    let games = |s: &Snapshot| mode.games(s);
    let deaths = |s: &Snapshot| s.get(mode.death());
    let lost = |s: &Snapshot| s.get(mode.lost());

    let mut row = vec![
        Cell::text("(Diff)"),
        Cell::count(mode.games(p1) - mode.games(p0)),
        Cell::count(delta(mode.kill())),
        Cell::count(delta(mode.death())),
        Cell::Text(signed(per_diff(mode.kill(), &deaths))),
        Cell::Text(signed(per_diff(mode.kill(), &games))),
        Cell::Text(flagged(whole(delta("assists")), flag)),
        Cell::Text(flagged(signed(per_diff("assists", &games)), flag)),
        Cell::Text(flagged(whole(delta("headshots")), flag)),
        Cell::Text(flagged(signed(per_diff("headshots", &games)), flag)),
        Cell::count(delta(mode.won())),
        Cell::count(delta(mode.lost())),
        Cell::Text(signed(per_diff(mode.won(), &lost))),
    ];
    if mode == Mode::Ranked {
        let season_losses = |s: &Snapshot| s.get("season_losses");
        row.extend([
            Cell::count(delta("season_wins")),
            Cell::count(delta("season_losses")),
            Cell::Text(signed(per_diff("season_wins", &season_losses))),
            Cell::Text(format!("{:+.2}", delta("mmr"))),
            Cell::count(delta("rank")),
            Cell::Text(format!("{:+.2}", delta("skill_mean"))),
            Cell::Text(format!("{:+.2}", delta("skill_std"))),
        ]);
    }
    row
}
