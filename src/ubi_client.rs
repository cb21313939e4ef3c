//! Blocking client for the Ubisoft statistics services.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::catalog::{MetricFamily, Region, request_names};
use crate::config::AppConfig;
use crate::credentials::{Credentials, load_credentials};
use crate::error::RemoteError;
use crate::http_client::http_client;
use crate::remote::{RankInfo, RemoteResult, StatMap, StatsSource};

const UBI_APP_ID: &str = "39baebad-39e5-4552-8c25-2c9b919064e2";
const LOGIN_URL: &str = "https://public-ubiservices.ubi.com/v3/profiles/sessions";
const PROFILES_URL: &str = "https://public-ubiservices.ubi.com/v2/profiles";
const USERS_URL: &str = "https://public-ubiservices.ubi.com/v2/users";
const SPACE_URL: &str = "https://public-ubiservices.ubi.com/v1/spaces/5172a557-50b5-4665-b7db-e3f2e8c5041d/sandboxes/OSBOR_PC_LNCH_A";
const MATCH_PLAYED_KEY: &str = "generalpvp_matchplayed:infinite";
const MAX_IDS_PER_REQUEST: usize = 40;

/// Authenticated session. Replaced as a whole by [`UbiClient::reauthenticate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub ticket: String,
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub expiration: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub profile_id: String,
    pub name: String,
}

pub struct UbiClient {
    client: &'static Client,
    credentials: Credentials,
    session: Option<Session>,
    session_path: Option<PathBuf>,
}

impl UbiClient {
    pub fn new(
        client: &'static Client,
        credentials: Credentials,
        session_path: Option<PathBuf>,
    ) -> Self {
        let session = session_path.as_ref().and_then(|path| {
            let raw = fs::read_to_string(path).ok()?;
            serde_json::from_str::<Session>(&raw).ok()
        });
        if session.is_some() {
            debug!("reusing cached remote session");
        }
        Self {
            client,
            credentials,
            session,
            session_path,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let credentials = match (&cfg.email, &cfg.password) {
            (Some(email), Some(password)) => Credentials {
                email: email.clone(),
                password: password.clone(),
            },
            _ => load_credentials(&cfg.credentials_path, &cfg.master_password)?,
        };
        let client = http_client(cfg.http_timeout_secs, UBI_APP_ID)?;
        Ok(Self::new(client, credentials, cfg.session_path.clone()))
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Logs in again and replaces the current session.
    pub fn reauthenticate(&mut self) -> RemoteResult<&Session> {
        let session = self.login()?;
        if let Err(err) = self.save_session(&session) {
            warn!("could not cache remote session: {err:#}");
        }
        info!("created a new remote session");
        Ok(&*self.session.insert(session))
    }

    fn login(&self) -> RemoteResult<Session> {
        let resp = self
            .client
            .post(LOGIN_URL)
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .basic_auth(&self.credentials.email, Some(&self.credentials.password))
            .json(&serde_json::json!({ "rememberMe": true }))
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(RemoteError::unavailable(format!(
                "login rejected with {status}: {}",
                snippet(&body)
            )));
        }
        parse_session(&body)
    }

    fn save_session(&self, session: &Session) -> Result<()> {
        let Some(path) = self.session_path.as_ref() else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).ok();
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string(session).context("serialize session")?;
        fs::write(&tmp, json).context("write session cache")?;
        fs::rename(&tmp, path).context("swap session cache")?;
        Ok(())
    }

    fn current_session(&mut self) -> RemoteResult<Session> {
        if let Some(session) = self.session.as_ref() {
            return Ok(session.clone());
        }
        Ok(self.reauthenticate()?.clone())
    }

    /// GET with one re-login and retry when the session is rejected.
    fn get_body(&mut self, url: &str) -> RemoteResult<String> {
        let session = self.current_session()?;
        match self.send_get(url, &session) {
            Err(RemoteError::AuthExpired) => {
                warn!("remote session rejected, logging in again");
                let session = self.reauthenticate()?.clone();
                self.send_get(url, &session)
            }
            other => other,
        }
    }

    fn send_get(&self, url: &str, session: &Session) -> RemoteResult<String> {
        let resp = self
            .client
            .get(url)
            .header("Ubi-SessionId", &session.session_id)
            .header(AUTHORIZATION, format!("Ubi_v1 t={}", session.ticket))
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::AuthExpired);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(RemoteError::unavailable(format!(
                "{status} from {url}: {}",
                snippet(&body)
            )));
        }
        Ok(body)
    }

    fn fetch_statistics(&mut self, ids: &[String], statistics: &[String]) -> RemoteResult<StatMap> {
        let mut out = StatMap::new();
        for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
            let url = format!(
                "{SPACE_URL}/playerstats2/statistics?populations={}&statistics={}",
                chunk.join(","),
                statistics.join(",")
            );
            let body = self.get_body(&url)?;
            out.extend(parse_statistics(&body, chunk)?);
        }
        Ok(out)
    }
}

impl StatsSource for UbiClient {
    fn resolve_player_id(&mut self, name: &str) -> RemoteResult<String> {
        let url = Url::parse_with_params(
            PROFILES_URL,
            &[("platformType", "uplay"), ("nameOnPlatform", name)],
        )
        .map_err(|e| RemoteError::unavailable(format!("bad profile url: {e}")))?;
        let body = self.get_body(url.as_str())?;
        parse_profiles(&body)?
            .into_iter()
            .next()
            .map(|p| p.profile_id)
            .ok_or_else(|| RemoteError::NotFound(format!("player {name}")))
    }

    fn player_name(&mut self, remote_id: &str) -> RemoteResult<String> {
        let body = self.get_body(&format!("{USERS_URL}/{remote_id}/profiles"))?;
        parse_profiles(&body)?
            .into_iter()
            .next()
            .map(|p| p.name)
            .ok_or_else(|| RemoteError::NotFound(format!("profile {remote_id}")))
    }

    fn fetch_stats(&mut self, ids: &[String]) -> RemoteResult<StatMap> {
        let names = request_names(&[
            MetricFamily::General,
            MetricFamily::Ranked,
            MetricFamily::Casual,
        ]);
        self.fetch_statistics(ids, &names)
    }

    fn fetch_operator_stats(&mut self, ids: &[String]) -> RemoteResult<StatMap> {
        let names = request_names(&[MetricFamily::Operator]);
        self.fetch_statistics(ids, &names)
    }

    fn fetch_weapon_stats(&mut self, ids: &[String]) -> RemoteResult<StatMap> {
        let names = request_names(&[MetricFamily::Weapon]);
        self.fetch_statistics(ids, &names)
    }

    fn fetch_rank(
        &mut self,
        remote_id: &str,
        region: Region,
        season: Option<u32>,
    ) -> RemoteResult<RankInfo> {
        let season = season.map(i64::from).unwrap_or(-1);
        let url = format!(
            "{SPACE_URL}/r6karma/players?board_id=pvp_ranked&region_id={region}&profile_ids={remote_id}&season_id={season}"
        );
        let body = self.get_body(&url)?;
        parse_rank(&body, remote_id)
    }

    fn fetch_total_games_played(&mut self, ids: &[String]) -> RemoteResult<HashMap<String, f64>> {
        let mut out = HashMap::new();
        for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
            let url = format!(
                "{SPACE_URL}/playerstats2/statistics?populations={}&statistics=generalpvp_matchplayed",
                chunk.join(",")
            );
            let body = self.get_body(&url)?;
            out.extend(parse_total_games(&body, chunk)?);
        }
        Ok(out)
    }
}

fn parse_json(raw: &str) -> RemoteResult<Value> {
    serde_json::from_str::<Value>(raw.trim())
        .map_err(|e| RemoteError::unavailable(format!("invalid json: {e}")))
}

pub fn parse_session(raw: &str) -> RemoteResult<Session> {
    let value = parse_json(raw)?;
    let ticket = value.get("ticket").and_then(|v| v.as_str());
    let session_id = value.get("sessionId").and_then(|v| v.as_str());
    let (Some(ticket), Some(session_id)) = (ticket, session_id) else {
        return Err(RemoteError::unavailable("login response without ticket"));
    };
    Ok(Session {
        ticket: ticket.to_string(),
        session_id: session_id.to_string(),
        user_id: value
            .get("userId")
            .or_else(|| value.get("profileId"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        expiration: value
            .get("expiration")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
    })
}

pub fn parse_profiles(raw: &str) -> RemoteResult<Vec<Profile>> {
    let value = parse_json(raw)?;
    let profiles = value
        .get("profiles")
        .and_then(|v| v.as_array())
        .ok_or_else(|| RemoteError::unavailable("missing profiles array"))?;
    Ok(profiles
        .iter()
        .filter_map(|p| {
            Some(Profile {
                profile_id: p.get("profileId")?.as_str()?.to_string(),
                name: p
                    .get("nameOnPlatform")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .collect())
}

/// `{"results": {id: {key: number}}}`. Ids the payload does not carry are left out
/// of the map; absent fields of a returned id are simply not present.
pub fn parse_statistics(raw: &str, ids: &[String]) -> RemoteResult<StatMap> {
    let value = parse_json(raw)?;
    let results = value
        .get("results")
        .and_then(|v| v.as_object())
        .ok_or_else(|| RemoteError::unavailable("missing results object"))?;
    let mut out = StatMap::new();
    for id in ids {
        let Some(obj) = results.get(id).and_then(|v| v.as_object()) else {
            continue;
        };
        let fields = obj
            .iter()
            .filter_map(|(key, v)| Some((key.clone(), as_f64_any(v)?)))
            .collect::<HashMap<_, _>>();
        out.insert(id.clone(), fields);
    }
    Ok(out)
}

/// Lifetime matches played per id; ids missing from the payload count 0.
pub fn parse_total_games(raw: &str, ids: &[String]) -> RemoteResult<HashMap<String, f64>> {
    let stats = parse_statistics(raw, ids)?;
    Ok(ids
        .iter()
        .map(|id| {
            let games = stats
                .get(id)
                .and_then(|fields| fields.get(MATCH_PLAYED_KEY))
                .copied()
                .unwrap_or(0.0);
            (id.clone(), games)
        })
        .collect())
}

/// `{"players": {id: {...}}}`
pub fn parse_rank(raw: &str, remote_id: &str) -> RemoteResult<RankInfo> {
    let value = parse_json(raw)?;
    let player = value
        .get("players")
        .and_then(|v| v.get(remote_id))
        .ok_or_else(|| RemoteError::NotFound(format!("rank for {remote_id}")))?;
    let num = |key: &str| player.get(key).and_then(as_f64_any).unwrap_or(0.0);
    Ok(RankInfo {
        mmr: num("mmr"),
        max_mmr: num("max_mmr"),
        skill_mean: num("skill_mean"),
        skill_stdev: num("skill_stdev"),
        rank: num("rank"),
        max_rank: num("max_rank"),
        wins: num("wins"),
        losses: num("losses"),
        season: num("season").max(0.0) as u32,
    })
}

fn as_f64_any(v: &Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<f64>().ok()
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}
