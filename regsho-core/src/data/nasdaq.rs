//! Nasdaq Trader threshold-list provider.
//!
//! Downloads `nasdaqth{YYYYMMDD}.txt` for a single date. The file for the
//! current day appears late in the evening (US Eastern); before that the
//! server answers with an error status or a header-only file.

use std::time::Duration;

use chrono::NaiveDate;

use super::parse::parse_response_body;
use super::provider::{FetchError, SnapshotFetcher};
use crate::domain::{DateKey, Snapshot};

pub const DEFAULT_URL_TEMPLATE: &str =
    "http://www.nasdaqtrader.com/dynamic/symdir/regsho/nasdaqth{date}.txt";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Blocking HTTP provider for the daily threshold file.
pub struct NasdaqProvider {
    client: reqwest::blocking::Client,
    url_template: String,
}

impl NasdaqProvider {
    /// Provider with the public Nasdaq URL and the default request timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_settings(DEFAULT_URL_TEMPLATE, DEFAULT_TIMEOUT)
    }

    /// `url_template` must contain a `{date}` placeholder.
    pub fn with_settings(url_template: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("regsho-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::ClientSetup(e.to_string()))?;

        Ok(Self {
            client,
            url_template: url_template.to_string(),
        })
    }

    /// URL of the file published for `date`.
    pub fn file_url(&self, date: &DateKey) -> String {
        self.url_template.replace("{date}", date.as_str())
    }
}

impl SnapshotFetcher for NasdaqProvider {
    fn name(&self) -> &str {
        "nasdaq_trader"
    }

    fn fetch(&self, date: NaiveDate) -> Result<Snapshot, FetchError> {
        let key = DateKey::from_date(date);
        let url = self.file_url(&key);

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                date: key,
            });
        }

        let body = resp
            .text()
            .map_err(|e| FetchError::Network(format!("reading body for {key}: {e}")))?;

        parse_response_body(&key, &body)
    }
}
