//! Canonical date keys.
//!
//! A `DateKey` is a fixed-width `YYYYMMDD` string. Every field is zero-padded,
//! so byte-wise string order equals chronological order. History maps, the
//! persisted JSON file and every analyzer sort rely on that property, which is
//! why the key stays textual instead of wrapping a `NaiveDate`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const KEY_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateKeyError {
    #[error("date key must be 8 ASCII digits, got '{0}'")]
    Malformed(String),

    #[error("date key '{0}' is not a valid calendar date")]
    InvalidDate(String),
}

/// A calendar date in canonical `YYYYMMDD` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(String);

impl DateKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format(KEY_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The calendar date this key names.
    pub fn to_date(&self) -> NaiveDate {
        // Construction validates the key, so this parse cannot fail.
        NaiveDate::parse_from_str(&self.0, KEY_FORMAT).unwrap_or_default()
    }

    /// Display form: `YYYY-MM-DD`.
    pub fn iso(&self) -> String {
        format!("{}-{}-{}", &self.0[..4], &self.0[4..6], &self.0[6..])
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DateKeyError::Malformed(s.to_string()));
        }
        NaiveDate::parse_from_str(s, KEY_FORMAT)
            .map_err(|_| DateKeyError::InvalidDate(s.to_string()))?;
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for DateKey {
    type Error = DateKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateKey> for String {
    fn from(key: DateKey) -> Self {
        key.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn formats_zero_padded() {
        assert_eq!(DateKey::from_date(d(2024, 1, 5)).as_str(), "20240105");
        assert_eq!(DateKey::from_date(d(2024, 1, 5)).iso(), "2024-01-05");
    }

    #[test]
    fn string_order_is_chronological() {
        let dates = [d(2023, 12, 31), d(2024, 1, 2), d(2024, 1, 10), d(2024, 10, 1)];
        for pair in dates.windows(2) {
            let (a, b) = (DateKey::from_date(pair[0]), DateKey::from_date(pair[1]));
            assert!(a < b, "{a} should sort before {b}");
        }
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(matches!("2024-01-05".parse::<DateKey>(), Err(DateKeyError::Malformed(_))));
        assert!(matches!("2024015".parse::<DateKey>(), Err(DateKeyError::Malformed(_))));
        assert!(matches!("20241301".parse::<DateKey>(), Err(DateKeyError::InvalidDate(_))));
        assert!("20240229".parse::<DateKey>().is_ok());
    }

    #[test]
    fn roundtrips_to_date() {
        let key: DateKey = "20240105".parse().unwrap();
        assert_eq!(key.to_date(), d(2024, 1, 5));
    }

    #[test]
    fn deserialization_validates() {
        let ok: DateKey = serde_json::from_str("\"20240105\"").unwrap();
        assert_eq!(ok.as_str(), "20240105");
        assert!(serde_json::from_str::<DateKey>("\"garbage\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"20240105\"");
    }
}
