//! In-memory [`StatsSource`] for offline runs and tests.

use std::collections::{HashMap, HashSet};

use crate::catalog::Region;
use crate::error::RemoteError;
use crate::remote::{RankInfo, RemoteResult, StatMap, StatsSource};

const MATCH_PLAYED_KEY: &str = "generalpvp_matchplayed:infinite";

#[derive(Debug, Clone, Default)]
struct FakePlayer {
    name: String,
    stats: HashMap<String, f64>,
    operators: HashMap<String, f64>,
    weapons: HashMap<String, f64>,
    ranks: HashMap<Region, RankInfo>,
    seasons: HashMap<u32, RankInfo>,
}

#[derive(Debug, Default)]
pub struct FakeStatsSource {
    players: HashMap<String, FakePlayer>,
    pub fail_bulk: bool,
    pub fail_total_games: bool,
    pub fail_rank_for: HashSet<String>,
    /// Ids left out of every bulk statistics payload.
    pub withheld: HashSet<String>,
    pub bulk_calls: usize,
    pub rank_calls: usize,
}

impl FakeStatsSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a player with an ncsa ladder entry for the current season.
    pub fn add_player(&mut self, remote_id: &str, name: &str) {
        let mut player = FakePlayer {
            name: name.to_string(),
            ..FakePlayer::default()
        };
        player.ranks.insert(
            Region::Ncsa,
            RankInfo {
                season: 12,
                ..RankInfo::default()
            },
        );
        self.players.insert(remote_id.to_string(), player);
    }

    pub fn rename(&mut self, remote_id: &str, name: &str) {
        if let Some(p) = self.players.get_mut(remote_id) {
            p.name = name.to_string();
        }
    }

    pub fn set_stat(&mut self, remote_id: &str, key: &str, value: f64) {
        if let Some(p) = self.players.get_mut(remote_id) {
            p.stats.insert(key.to_string(), value);
        }
    }

    pub fn set_operator_stat(&mut self, remote_id: &str, key: &str, value: f64) {
        if let Some(p) = self.players.get_mut(remote_id) {
            p.operators.insert(key.to_string(), value);
        }
    }

    pub fn set_weapon_stat(&mut self, remote_id: &str, key: &str, value: f64) {
        if let Some(p) = self.players.get_mut(remote_id) {
            p.weapons.insert(key.to_string(), value);
        }
    }

    pub fn set_rank(&mut self, remote_id: &str, region: Region, rank: RankInfo) {
        if let Some(p) = self.players.get_mut(remote_id) {
            p.ranks.insert(region, rank);
        }
    }

    pub fn set_season(&mut self, remote_id: &str, season: u32, rank: RankInfo) {
        if let Some(p) = self.players.get_mut(remote_id) {
            p.seasons.insert(season, RankInfo { season, ..rank });
        }
    }

    /// Simulates finished ranked matches: bumps won/lost and the lifetime match counter.
    pub fn play_ranked(&mut self, remote_id: &str, won: f64, lost: f64) {
        self.bump(remote_id, "rankedpvp_matchwon:infinite", won);
        self.bump(remote_id, "rankedpvp_matchlost:infinite", lost);
        self.bump(remote_id, MATCH_PLAYED_KEY, won + lost);
        if let Some(rank) = self
            .players
            .get_mut(remote_id)
            .and_then(|p| p.ranks.get_mut(&Region::Ncsa))
        {
            rank.wins += won;
            rank.losses += lost;
        }
    }

    pub fn play_casual(&mut self, remote_id: &str, won: f64, lost: f64) {
        self.bump(remote_id, "casualpvp_matchwon:infinite", won);
        self.bump(remote_id, "casualpvp_matchlost:infinite", lost);
        self.bump(remote_id, MATCH_PLAYED_KEY, won + lost);
    }

    fn bump(&mut self, remote_id: &str, key: &str, by: f64) {
        if let Some(p) = self.players.get_mut(remote_id) {
            *p.stats.entry(key.to_string()).or_insert(0.0) += by;
        }
    }

    fn bulk(
        &mut self,
        ids: &[String],
        pick: impl Fn(&FakePlayer) -> &HashMap<String, f64>,
    ) -> RemoteResult<StatMap> {
        self.bulk_calls += 1;
        if self.fail_bulk {
            return Err(RemoteError::unavailable("bulk statistics offline"));
        }
        Ok(ids
            .iter()
            .filter(|id| !self.withheld.contains(*id))
            .filter_map(|id| Some((id.clone(), pick(self.players.get(id)?).clone())))
            .collect())
    }
}

impl StatsSource for FakeStatsSource {
    fn resolve_player_id(&mut self, name: &str) -> RemoteResult<String> {
        self.players
            .iter()
            .find(|(_, p)| p.name.eq_ignore_ascii_case(name))
            .map(|(id, _)| id.clone())
            .ok_or_else(|| RemoteError::NotFound(format!("player {name}")))
    }

    fn player_name(&mut self, remote_id: &str) -> RemoteResult<String> {
        self.players
            .get(remote_id)
            .map(|p| p.name.clone())
            .ok_or_else(|| RemoteError::NotFound(format!("profile {remote_id}")))
    }

    fn fetch_stats(&mut self, ids: &[String]) -> RemoteResult<StatMap> {
        self.bulk(ids, |p| &p.stats)
    }

    fn fetch_operator_stats(&mut self, ids: &[String]) -> RemoteResult<StatMap> {
        self.bulk(ids, |p| &p.operators)
    }

    fn fetch_weapon_stats(&mut self, ids: &[String]) -> RemoteResult<StatMap> {
        self.bulk(ids, |p| &p.weapons)
    }

    fn fetch_rank(
        &mut self,
        remote_id: &str,
        region: Region,
        season: Option<u32>,
    ) -> RemoteResult<RankInfo> {
        self.rank_calls += 1;
        if self.fail_rank_for.contains(remote_id) {
            return Err(RemoteError::unavailable(format!("rank for {remote_id}")));
        }
        let player = self
            .players
            .get(remote_id)
            .ok_or_else(|| RemoteError::NotFound(format!("rank for {remote_id}")))?;
        let info = match season {
            Some(season) => player.seasons.get(&season).cloned().unwrap_or(RankInfo {
                season,
                ..RankInfo::default()
            }),
            None => player.ranks.get(&region).cloned().unwrap_or_default(),
        };
        Ok(info)
    }

    fn fetch_total_games_played(&mut self, ids: &[String]) -> RemoteResult<HashMap<String, f64>> {
        if self.fail_total_games {
            return Err(RemoteError::unavailable("games played offline"));
        }
        Ok(ids
            .iter()
            .map(|id| {
                let games = self
                    .players
                    .get(id)
                    .and_then(|p| p.stats.get(MATCH_PLAYED_KEY))
                    .copied()
                    .unwrap_or(0.0);
                (id.clone(), games)
            })
            .collect())
    }
}
