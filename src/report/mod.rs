//! Snapshot-diff reports.
//!
//! A request resolves its time range, selects a baseline plus every snapshot in the
//! window, optionally keeps only the latest snapshot of each day bucket, then walks
//! consecutive representatives and emits one delta row per interval with games.

mod modes;
mod operators;
pub mod peek;
pub mod roster;
mod seasons;
pub mod table;
mod weapons;

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use tracing::debug;

use crate::catalog::StatTable;
use crate::error::ReportError;
use crate::store::{self, Snapshot};
use crate::timefmt;

pub use table::{Cell, ReportTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Ranked,
    Casual,
    Weapons,
    Operators,
    Seasons,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::Ranked,
        ReportKind::Casual,
        ReportKind::Weapons,
        ReportKind::Operators,
        ReportKind::Seasons,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Ranked => "ranked",
            ReportKind::Casual => "casual",
            ReportKind::Weapons => "weapons",
            ReportKind::Operators => "operators",
            ReportKind::Seasons => "seasons",
        }
    }

    fn tables(self) -> &'static [StatTable] {
        match self {
            ReportKind::Weapons => &[StatTable::Stats, StatTable::Weapons],
            ReportKind::Operators => &[StatTable::Stats, StatTable::Operators],
            _ => &[StatTable::Stats],
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ranked" => Ok(ReportKind::Ranked),
            "casual" => Ok(ReportKind::Casual),
            "weapons" | "weapon" | "gun" | "guns" => Ok(ReportKind::Weapons),
            "operators" | "operator" | "ops" => Ok(ReportKind::Operators),
            "seasons" | "season" => Ok(ReportKind::Seasons),
            other => Err(format!(
                "unknown report kind {other:?} (ranked, casual, weapons, operators, seasons)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStyle {
    /// One delta row per interval.
    Incremental,
    /// Lifetime values per representative plus a first-to-last diff.
    Cumulative,
}

impl FromStr for ReportStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "incremental" | "increment" | "inc" => Ok(ReportStyle::Incremental),
            "cumulative" | "cum" => Ok(ReportStyle::Cumulative),
            other => Err(format!(
                "unknown report style {other:?} (incremental, cumulative)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub player: String,
    pub kind: ReportKind,
    pub style: ReportStyle,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    /// Bucket width in days; 0 keeps every snapshot.
    pub increment_days: u32,
    /// Time of day buckets start at.
    pub cutoff: NaiveTime,
}

impl ReportRequest {
    pub fn new(player: impl Into<String>, kind: ReportKind) -> Self {
        Self {
            player: player.into(),
            kind,
            style: ReportStyle::Incremental,
            start: None,
            end: None,
            increment_days: 0,
            cutoff: NaiveTime::MIN,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Table(ReportTable),
    /// Fewer than two usable snapshots; `found` is how many there were.
    InsufficientData { kind: ReportKind, found: usize },
}

impl ReportOutcome {
    pub fn table(&self) -> Option<&ReportTable> {
        match self {
            ReportOutcome::Table(table) => Some(table),
            ReportOutcome::InsufficientData { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bucket {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Representative<'a> {
    pub snap: &'a Snapshot,
    pub bucket: Option<Bucket>,
}

/// Baseline followed by the representatives to diff against it, in time order.
#[derive(Debug, Clone)]
pub(crate) struct Selection<'a> {
    pub baseline: &'a Snapshot,
    pub reps: Vec<Representative<'a>>,
}

impl Selection<'_> {
    pub fn last(&self) -> &Snapshot {
        self.reps.last().map(|r| r.snap).unwrap_or(self.baseline)
    }
}

/// Row label for the interval ending at `r1`.
pub(crate) fn interval_label(r0: &Snapshot, r1: &Representative<'_>) -> String {
    match r1.bucket {
        Some(bucket) => format!(
            "{} to {}",
            timefmt::display_date(bucket.from),
            timefmt::display_date(bucket.to)
        ),
        None => format!(
            "{} to {}",
            timefmt::display(r0.taken_at),
            timefmt::display(r1.snap.taken_at)
        ),
    }
}

enum SnapshotReport {
    Mode(modes::Mode),
    Weapons,
    Operators,
}

pub fn run_report(conn: &Connection, req: &ReportRequest) -> Result<ReportOutcome, ReportError> {
    let player = store::find_player_by_name(conn, &req.player)?
        .ok_or_else(|| ReportError::UnknownPlayer(req.player.clone()))?;
    let report = match req.kind {
        ReportKind::Seasons => return seasons::season_report(conn, &player),
        ReportKind::Ranked => SnapshotReport::Mode(modes::Mode::Ranked),
        ReportKind::Casual => SnapshotReport::Mode(modes::Mode::Casual),
        ReportKind::Weapons => SnapshotReport::Weapons,
        ReportKind::Operators => SnapshotReport::Operators,
    };
    let insufficient = |found| ReportOutcome::InsufficientData {
        kind: req.kind,
        found,
    };

    let start = match req.start {
        Some(start) => start,
        None => match store::earliest_record_time(conn)? {
            Some(start) => start,
            None => return Ok(insufficient(0)),
        },
    };
    let end = req.end.unwrap_or_else(timefmt::now);
    if start > end {
        return Err(ReportError::InvalidRange { start, end });
    }
    let start = if req.increment_days > 0 {
        start.date().and_time(req.cutoff)
    } else {
        start
    };

    let snaps = store::snapshots_in_range(conn, req.kind.tables(), player.id, start, end)?;
    debug!(
        player = %player.name,
        kind = %req.kind,
        found = snaps.len(),
        "report snapshots selected"
    );
    if snaps.len() < 2 {
        return Ok(insufficient(snaps.len()));
    }
    let Some(sel) = select_representatives(&snaps, start, end, req.increment_days) else {
        return Ok(insufficient(snaps.len()));
    };
    let table = match report {
        SnapshotReport::Mode(mode) => match req.style {
            ReportStyle::Incremental => modes::incremental(mode, &player.name, &sel),
            ReportStyle::Cumulative => modes::cumulative(mode, &player.name, &sel),
        },
        SnapshotReport::Weapons => weapons::weapon_report(&player.name, &sel),
        SnapshotReport::Operators => operators::operator_report(&player.name, &sel),
    };
    Ok(ReportOutcome::Table(table))
}

/// `snaps[0]` is the baseline. With `increment_days == 0` every later snapshot is a
/// representative; otherwise each half-open `increment_days` bucket from `start`
/// keeps its latest snapshot, and a snapshot exactly at `end` on a bucket boundary
/// belongs to the bucket before it.
pub(crate) fn select_representatives(
    snaps: &[Snapshot],
    start: NaiveDateTime,
    end: NaiveDateTime,
    increment_days: u32,
) -> Option<Selection<'_>> {
    let (baseline, rest) = snaps.split_first()?;
    if increment_days == 0 {
        return Some(Selection {
            baseline,
            reps: rest
                .iter()
                .map(|snap| Representative { snap, bucket: None })
                .collect(),
        });
    }

    let width = i64::from(increment_days) * 86_400;
    let mut keyed: Vec<(i64, &Snapshot)> = Vec::new();
    for snap in rest {
        let offset = (snap.taken_at - start).num_seconds().max(0);
        let mut key = offset / width;
        if key > 0 && offset % width == 0 && snap.taken_at == end {
            key -= 1;
        }
        match keyed.last_mut() {
            Some((last, slot)) if *last == key => *slot = snap,
            _ => keyed.push((key, snap)),
        }
    }

    let reps = keyed
        .into_iter()
        .map(|(key, snap)| {
            let from = start
                .checked_add_signed(Duration::days(key * i64::from(increment_days)))
                .unwrap_or(end);
            let to = from
                .checked_add_signed(Duration::days(i64::from(increment_days)))
                .unwrap_or(end);
            Representative {
                snap,
                bucket: Some(Bucket {
                    from: from.date(),
                    to: to.date(),
                }),
            }
        })
        .collect();
    Some(Selection { baseline, reps })
}
