use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Region;
use crate::error::RemoteError;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Remote id to (remote field key to value).
pub type StatMap = HashMap<String, HashMap<String, f64>>;

/// Ladder standing of one player in one region and season.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankInfo {
    pub mmr: f64,
    pub max_mmr: f64,
    pub skill_mean: f64,
    pub skill_stdev: f64,
    pub rank: f64,
    pub max_rank: f64,
    pub wins: f64,
    pub losses: f64,
    pub season: u32,
}

impl RankInfo {
    pub fn games(&self) -> f64 {
        self.wins + self.losses
    }

    /// Values keyed by the storage columns of the ladder family.
    pub fn progress_values(&self) -> HashMap<String, f64> {
        HashMap::from([
            ("mmr".to_string(), self.mmr),
            ("max_mmr".to_string(), self.max_mmr),
            ("skill_mean".to_string(), self.skill_mean),
            ("skill_std".to_string(), self.skill_stdev),
            ("rank".to_string(), self.rank),
            ("max_rank".to_string(), self.max_rank),
            ("season_wins".to_string(), self.wins),
            ("season_losses".to_string(), self.losses),
        ])
    }
}

/// Source of live statistics. Calls are batched by remote id where the service allows it.
pub trait StatsSource {
    fn resolve_player_id(&mut self, name: &str) -> RemoteResult<String>;

    fn player_name(&mut self, remote_id: &str) -> RemoteResult<String>;

    fn fetch_stats(&mut self, ids: &[String]) -> RemoteResult<StatMap>;

    fn fetch_operator_stats(&mut self, ids: &[String]) -> RemoteResult<StatMap>;

    fn fetch_weapon_stats(&mut self, ids: &[String]) -> RemoteResult<StatMap>;

    /// `season` of `None` asks for the current season.
    fn fetch_rank(
        &mut self,
        remote_id: &str,
        region: Region,
        season: Option<u32>,
    ) -> RemoteResult<RankInfo>;

    fn fetch_total_games_played(&mut self, ids: &[String]) -> RemoteResult<HashMap<String, f64>>;
}
