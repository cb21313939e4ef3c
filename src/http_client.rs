use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

static CLIENT: OnceCell<Client> = OnceCell::new();

const USER_AGENT: &str = concat!("siege_tracker/", env!("CARGO_PKG_VERSION"));

/// Shared client carrying the `Ubi-AppId` header on every request. The timeout of
/// the first call wins.
pub fn http_client(timeout_secs: u64, app_id: &str) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("ubi-appid"),
            HeaderValue::from_str(app_id).context("invalid app id header")?,
        );
        Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("failed to build http client")
    })
}
