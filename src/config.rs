use std::env;
use std::path::PathBuf;

use chrono::NaiveTime;
use tracing::warn;

use crate::timefmt;

const CACHE_DIR: &str = "siege_tracker";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub credentials_path: PathBuf,
    pub session_path: Option<PathBuf>,
    pub master_password: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub http_timeout_secs: u64,
    pub day_cutoff: NaiveTime,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let base = app_cache_dir().unwrap_or_else(|| PathBuf::from("."));
        let db_path = env_path("TRACKER_DB_PATH").unwrap_or_else(|| base.join("tracker.sqlite"));
        let credentials_path =
            env_path("TRACKER_CREDENTIALS_PATH").unwrap_or_else(|| base.join("login.txt"));
        let session_path = app_cache_dir().map(|dir| dir.join("session.json"));
        let master_password = env::var("TRACKER_MASTER_PASSWORD").unwrap_or_default();
        let email = env_nonempty("UBI_EMAIL");
        let password = env_nonempty("UBI_PASSWORD");
        let http_timeout_secs = env::var("TRACKER_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
            .clamp(2, 120);
        let day_cutoff = match env_nonempty("TRACKER_DAY_CUTOFF") {
            Some(raw) => timefmt::parse_cutoff(&raw).unwrap_or_else(|err| {
                warn!("ignoring TRACKER_DAY_CUTOFF: {err}");
                NaiveTime::MIN
            }),
            None => NaiveTime::MIN,
        };
        let log_level = env::var("TRACKER_LOG")
            .unwrap_or_else(|_| "info".to_string())
            .trim()
            .to_ascii_lowercase();

        Self {
            db_path,
            credentials_path,
            session_path,
            master_password,
            email,
            password,
            http_timeout_secs,
            day_cutoff,
            log_level,
        }
    }
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_nonempty(key).map(PathBuf::from)
}
