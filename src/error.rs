use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote session expired or was rejected")]
    AuthExpired,
    #[error("not found on remote service: {0}")]
    NotFound(String),
    #[error("remote service unavailable: {0}")]
    Unavailable(String),
}

impl RemoteError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        RemoteError::Unavailable(msg.into())
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Unavailable(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("player with remote id {0} is already tracked")]
    DuplicateIdentity(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("snapshot for player {player_id} record {record_id} already exists in {table}")]
    ConstraintViolation {
        table: &'static str,
        player_id: i64,
        record_id: i64,
    },
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unknown player {0}")]
    UnknownPlayer(String),
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
