//! Static metric definitions shared by the snapshot writer and the report engine.
//!
//! Every stored column is declared here once. Weapon and operator columns are
//! generated from [`WEAPONS`] and [`OPERATORS`], so adding either is a data change.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricFamily {
    General,
    Ranked,
    Casual,
    Weapon,
    Operator,
    Progress,
}

/// Snapshot tables keyed by (player, record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatTable {
    Stats,
    Weapons,
    Operators,
}

impl StatTable {
    pub const ALL: [StatTable; 3] = [StatTable::Stats, StatTable::Weapons, StatTable::Operators];

    pub fn name(self) -> &'static str {
        match self {
            StatTable::Stats => "stats",
            StatTable::Weapons => "weapon_stats",
            StatTable::Operators => "operator_stats",
        }
    }

    pub fn families(self) -> &'static [MetricFamily] {
        match self {
            StatTable::Stats => &[
                MetricFamily::General,
                MetricFamily::Ranked,
                MetricFamily::Casual,
                MetricFamily::Progress,
            ],
            StatTable::Weapons => &[MetricFamily::Weapon],
            StatTable::Operators => &[MetricFamily::Operator],
        }
    }

    pub fn columns(self) -> Vec<&'static str> {
        let families = self.families();
        catalog()
            .iter()
            .filter(|def| families.contains(&def.family))
            .map(|def| def.column.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricDef {
    pub remote_key: String,
    pub column: String,
    pub label: String,
    pub family: MetricFamily,
}

impl MetricDef {
    /// Statistic name used in remote requests (`rankedpvp_kills`).
    pub fn request_name(&self) -> &str {
        self.remote_key
            .split(':')
            .next()
            .unwrap_or(self.remote_key.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    Attack,
    Defense,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Attack => "atk",
            Side::Defense => "def",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WeaponClass {
    pub index: u8,
    pub key: &'static str,
    pub name: &'static str,
    pub short: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Operator {
    pub id: &'static str,
    pub name: &'static str,
    pub key: &'static str,
    pub side: Side,
}

impl Operator {
    pub fn column(&self, stat: OperatorStat) -> String {
        format!("{}_{}", self.key, stat.suffix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponStat {
    Fired,
    Hit,
    Kill,
    Headshot,
}

impl WeaponStat {
    pub const ALL: [WeaponStat; 4] = [
        WeaponStat::Fired,
        WeaponStat::Hit,
        WeaponStat::Kill,
        WeaponStat::Headshot,
    ];

    fn remote(self) -> &'static str {
        match self {
            WeaponStat::Fired => "weapontypepvp_bulletfired",
            WeaponStat::Hit => "weapontypepvp_bullethit",
            WeaponStat::Kill => "weapontypepvp_kills",
            WeaponStat::Headshot => "weapontypepvp_headshot",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            WeaponStat::Fired => "fired",
            WeaponStat::Hit => "hit",
            WeaponStat::Kill => "kill",
            WeaponStat::Headshot => "headshot",
        }
    }

    fn label(self) -> &'static str {
        match self {
            WeaponStat::Fired => "Fired",
            WeaponStat::Hit => "Hit",
            WeaponStat::Kill => "Kills",
            WeaponStat::Headshot => "Headshots",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorStat {
    TimePlayed,
    RoundsWon,
    RoundsLost,
    Kills,
    Deaths,
}

impl OperatorStat {
    pub const ALL: [OperatorStat; 5] = [
        OperatorStat::TimePlayed,
        OperatorStat::RoundsWon,
        OperatorStat::RoundsLost,
        OperatorStat::Kills,
        OperatorStat::Deaths,
    ];

    fn remote(self) -> &'static str {
        match self {
            OperatorStat::TimePlayed => "operatorpvp_timeplayed",
            OperatorStat::RoundsWon => "operatorpvp_roundwon",
            OperatorStat::RoundsLost => "operatorpvp_roundlost",
            OperatorStat::Kills => "operatorpvp_kills",
            OperatorStat::Deaths => "operatorpvp_death",
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            OperatorStat::TimePlayed => "tp",
            OperatorStat::RoundsWon => "rw",
            OperatorStat::RoundsLost => "rl",
            OperatorStat::Kills => "k",
            OperatorStat::Deaths => "d",
        }
    }

    fn label(self) -> &'static str {
        match self {
            OperatorStat::TimePlayed => "Time Played",
            OperatorStat::RoundsWon => "Round Won",
            OperatorStat::RoundsLost => "Round Lost",
            OperatorStat::Kills => "Kills",
            OperatorStat::Deaths => "Deaths",
        }
    }
}

pub fn weapon_column(stat: WeaponStat, weapon: &WeaponClass) -> String {
    format!("{}_{}", stat.prefix(), weapon.key)
}

pub const WEAPONS: &[WeaponClass] = &[
    WeaponClass { index: 1, key: "ar", name: "Assault Rifle", short: "AR" },
    WeaponClass { index: 2, key: "smg", name: "Submachine Gun", short: "SMG" },
    WeaponClass { index: 3, key: "lmg", name: "Light Machine Gun", short: "LMG" },
    WeaponClass { index: 4, key: "marksman", name: "Marksman Rifle", short: "MR" },
    WeaponClass { index: 5, key: "handgun", name: "Handgun", short: "HG" },
    WeaponClass { index: 6, key: "shotgun", name: "Shotgun", short: "SH" },
    WeaponClass { index: 7, key: "mp", name: "Machine Pistol", short: "MP" },
];

const fn op(id: &'static str, name: &'static str, key: &'static str, side: Side) -> Operator {
    Operator { id, name, key, side }
}

pub const OPERATORS: &[Operator] = &[
    op("2:1", "Smoke", "smoke", Side::Defense),
    op("2:2", "Castle", "castle", Side::Defense),
    op("2:3", "Doc", "doc", Side::Defense),
    op("2:4", "Glaz", "glaz", Side::Attack),
    op("2:5", "Blitz", "blitz", Side::Attack),
    op("2:6", "Buck", "buck", Side::Attack),
    op("2:7", "Blackbeard", "bb", Side::Attack),
    op("2:8", "Capitao", "capitao", Side::Attack),
    op("2:9", "Hibana", "hibana", Side::Attack),
    op("2:10", "Maverick", "maverick", Side::Attack),
    op("2:11", "Nomad", "nomad", Side::Attack),
    op("2:A", "Jackal", "jackal", Side::Attack),
    op("2:B", "Ying", "ying", Side::Attack),
    op("2:C", "Ela", "ela", Side::Defense),
    op("2:D", "Dokkaebi", "dokkaebi", Side::Attack),
    op("2:F", "Maestro", "maestro", Side::Defense),
    op("3:1", "Mute", "mute", Side::Defense),
    op("3:2", "Ash", "ash", Side::Attack),
    op("3:3", "Rook", "rook", Side::Defense),
    op("3:4", "Fuze", "fuze", Side::Attack),
    op("3:5", "IQ", "iq", Side::Attack),
    op("3:6", "Frost", "frost", Side::Defense),
    op("3:7", "Valkyrie", "valkyrie", Side::Defense),
    op("3:8", "Caveira", "cav", Side::Defense),
    op("3:9", "Echo", "echo", Side::Defense),
    op("3:10", "Clash", "clash", Side::Defense),
    op("3:11", "Kaid", "kaid", Side::Defense),
    op("3:A", "Mira", "mira", Side::Defense),
    op("3:B", "Lesion", "lesion", Side::Defense),
    op("3:C", "Zofia", "zofia", Side::Attack),
    op("3:D", "Vigil", "vigil", Side::Defense),
    op("3:E", "Lion", "lion", Side::Attack),
    op("3:F", "Alibi", "alibi", Side::Defense),
    op("4:1", "Sledge", "sledge", Side::Attack),
    op("4:2", "Pulse", "pulse", Side::Defense),
    op("4:3", "Twitch", "twitch", Side::Attack),
    op("4:4", "Kapkan", "kapkan", Side::Defense),
    op("4:5", "Jager", "jager", Side::Defense),
    op("4:E", "Finka", "finka", Side::Attack),
    op("5:1", "Thatcher", "thatcher", Side::Attack),
    op("5:2", "Thermite", "thermite", Side::Attack),
    op("5:3", "Montagne", "montagne", Side::Attack),
    op("5:4", "Tachanka", "tach", Side::Defense),
    op("5:5", "Bandit", "bandit", Side::Defense),
];

/// (remote key, column, label, family) for the aggregate stats row.
const STAT_DEFS: &[(&str, &str, &str, MetricFamily)] = &[
    ("generalpvp_matchplayed:infinite", "match_played", "Matches Played", MetricFamily::General),
    ("generalpvp_timeplayed:infinite", "time_played", "Time Played", MetricFamily::General),
    ("rankedpvp_kills:infinite", "ranked_kill", "Ranked Kills", MetricFamily::Ranked),
    ("rankedpvp_death:infinite", "ranked_death", "Ranked Deaths", MetricFamily::Ranked),
    ("rankedpvp_matchwon:infinite", "ranked_won", "Ranked Won", MetricFamily::Ranked),
    ("rankedpvp_matchlost:infinite", "ranked_lost", "Ranked Lost", MetricFamily::Ranked),
    ("casualpvp_kills:infinite", "casual_kill", "Casual Kills", MetricFamily::Casual),
    ("casualpvp_death:infinite", "casual_death", "Casual Deaths", MetricFamily::Casual),
    ("casualpvp_matchwon:infinite", "casual_won", "Casual Won", MetricFamily::Casual),
    ("casualpvp_matchlost:infinite", "casual_lost", "Casual Lost", MetricFamily::Casual),
    ("generalpvp_killassists:infinite", "assists", "Assists", MetricFamily::General),
    ("generalpvp_headshot:infinite", "headshots", "Headshots", MetricFamily::General),
];

const PROGRESS_DEFS: &[(&str, &str, &str)] = &[
    ("mmr", "mmr", "MMR"),
    ("max_mmr", "max_mmr", "Max MMR"),
    ("skill_mean", "skill_mean", "Skill Mean"),
    ("skill_stdev", "skill_std", "Skill St.Dev"),
    ("rank", "rank", "Rank"),
    ("max_rank", "max_rank", "Max.Rank"),
    ("wins", "season_wins", "Season Wins"),
    ("losses", "season_losses", "Season Losses"),
];

static CATALOG: Lazy<Vec<MetricDef>> = Lazy::new(build_catalog);

static BY_COLUMN: Lazy<HashMap<&'static str, &'static MetricDef>> = Lazy::new(|| {
    catalog()
        .iter()
        .map(|def| (def.column.as_str(), def))
        .collect()
});

fn build_catalog() -> Vec<MetricDef> {
    let mut defs = Vec::new();
    for (remote_key, column, label, family) in STAT_DEFS {
        defs.push(MetricDef {
            remote_key: remote_key.to_string(),
            column: column.to_string(),
            label: label.to_string(),
            family: *family,
        });
    }
    for (remote_key, column, label) in PROGRESS_DEFS {
        defs.push(MetricDef {
            remote_key: remote_key.to_string(),
            column: column.to_string(),
            label: label.to_string(),
            family: MetricFamily::Progress,
        });
    }
    for weapon in WEAPONS {
        for stat in WeaponStat::ALL {
            defs.push(MetricDef {
                remote_key: format!("{}:{}:infinite", stat.remote(), weapon.index),
                column: weapon_column(stat, weapon),
                label: format!("{} {}", weapon.short, stat.label()),
                family: MetricFamily::Weapon,
            });
        }
    }
    for operator in OPERATORS {
        for stat in OperatorStat::ALL {
            defs.push(MetricDef {
                remote_key: format!("{}:{}:infinite", stat.remote(), operator.id),
                column: operator.column(stat),
                label: format!("{} {}", operator.name, stat.label()),
                family: MetricFamily::Operator,
            });
        }
    }
    defs
}

/// Every metric in declared order.
pub fn catalog() -> &'static [MetricDef] {
    CATALOG.as_slice()
}

pub fn metrics_in(family: MetricFamily) -> impl Iterator<Item = &'static MetricDef> {
    catalog().iter().filter(move |def| def.family == family)
}

pub fn metric_by_column(column: &str) -> Option<&'static MetricDef> {
    BY_COLUMN.get(column).copied()
}

/// Distinct statistic names to request for the given families, in declared order.
pub fn request_names(families: &[MetricFamily]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for def in catalog().iter().filter(|def| families.contains(&def.family)) {
        let name = def.request_name();
        if !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

/// Converts a remote statistics payload into storage columns for `table`.
/// Ladder fields are not part of the statistics payload and are left out.
pub fn columns_from_remote(table: StatTable, payload: &HashMap<String, f64>) -> HashMap<String, f64> {
    let families = table.families();
    catalog()
        .iter()
        .filter(|def| def.family != MetricFamily::Progress && families.contains(&def.family))
        .map(|def| {
            let value = payload.get(&def.remote_key).copied().unwrap_or(0.0);
            (def.column.clone(), value)
        })
        .collect()
}

/// Operators ordered by (side, name), the order reports list them in.
pub fn sorted_operators() -> Vec<&'static Operator> {
    let mut ops = OPERATORS.iter().collect::<Vec<_>>();
    ops.sort_by(|a, b| a.side.cmp(&b.side).then_with(|| a.name.cmp(b.name)));
    ops
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Ncsa,
    Emea,
    Apac,
}

impl Region {
    /// Priority order for region detection ties.
    pub const ALL: [Region; 3] = [Region::Ncsa, Region::Emea, Region::Apac];

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Ncsa => "ncsa",
            Region::Emea => "emea",
            Region::Apac => "apac",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Region::Ncsa => "America",
            Region::Emea => "Europe",
            Region::Apac => "Asia",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown region {0:?} (expected ncsa, emea or apac)")]
pub struct UnknownRegion(pub String);

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ncsa" | "america" | "na" => Ok(Region::Ncsa),
            "emea" | "europe" | "eu" => Ok(Region::Emea),
            "apac" | "asia" => Ok(Region::Apac),
            _ => Err(UnknownRegion(s.to_string())),
        }
    }
}

pub const MAPS: &[&str] = &[
    "Bank",
    "Bartlett",
    "Border",
    "Chalet",
    "Clubhouse",
    "Coastline",
    "Consulate",
    "Favela",
    "Fortress",
    "Hereford",
    "House",
    "Kafe Dostoyevsky",
    "Kanal",
    "Oregon",
    "Plane",
    "Skyscraper",
    "Theme Park",
    "Tower",
    "Villa",
    "Yacht",
];

/// A map from [`MAPS`], matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameMap(&'static str);

impl GameMap {
    pub fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for GameMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Error)]
#[error("unknown map {0:?}")]
pub struct UnknownMap(pub String);

impl FromStr for GameMap {
    type Err = UnknownMap;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        MAPS.iter()
            .find(|m| m.eq_ignore_ascii_case(wanted))
            .copied()
            .map(GameMap)
            .ok_or_else(|| UnknownMap(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queue {
    Ranked,
    Casual,
}

impl Queue {
    pub fn as_str(self) -> &'static str {
        match self {
            Queue::Ranked => "ranked",
            Queue::Casual => "casual",
        }
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown queue {0:?} (expected ranked or casual)")]
pub struct UnknownQueue(pub String);

impl FromStr for Queue {
    type Err = UnknownQueue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ranked" => Ok(Queue::Ranked),
            "casual" => Ok(Queue::Casual),
            _ => Err(UnknownQueue(s.to_string())),
        }
    }
}

pub const RANKS: &[&str] = &[
    "Unranked",
    "Copper IV",
    "Copper III",
    "Copper II",
    "Copper I",
    "Bronze IV",
    "Bronze III",
    "Bronze II",
    "Bronze I",
    "Silver IV",
    "Silver III",
    "Silver II",
    "Silver I",
    "Gold IV",
    "Gold III",
    "Gold II",
    "Gold I",
    "Platinum III",
    "Platinum II",
    "Platinum I",
    "Diamond",
];

pub const SEASONS: &[&str] = &[
    "",
    "BLACK ICE",
    "DUST LINE",
    "SKULL RAIN",
    "RED CROW",
    "VELVET SHELL",
    "HEALTH",
    "BLOOD ORCHID",
    "WHITE NOISE",
    "CHIMERA",
    "PARA BELLUM",
    "GRIM SKY",
    "WIND BASTION",
];

pub fn rank_name(rank: f64) -> &'static str {
    let idx = rank.round();
    if idx < 0.0 {
        return "Unknown";
    }
    RANKS.get(idx as usize).copied().unwrap_or("Unknown")
}

pub fn season_name(season: u32) -> &'static str {
    SEASONS.get(season as usize).copied().unwrap_or("")
}
