//! Fetch collaborator trait and its error type.
//!
//! The `SnapshotFetcher` trait abstracts over the upstream source so the
//! updater can be driven by the Nasdaq provider in production and by canned
//! fetchers in tests.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{DateKey, Snapshot};

/// Why a day's snapshot is not available.
///
/// Every variant means "not available"; none of them is fatal. The updater
/// leaves the date unwritten so it is fetched again on the next run.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    Network(String),

    #[error("HTTP {status} for {date}")]
    HttpStatus { status: u16, date: DateKey },

    #[error("response for {date} has no '|' delimited rows")]
    MissingDelimiter { date: DateKey },

    #[error("file for {date} has no threshold rows (not yet published)")]
    NotPublished { date: DateKey },

    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),
}

impl FetchError {
    /// The upstream answered with a well-formed but empty file.
    pub fn is_not_published(&self) -> bool {
        matches!(self, FetchError::NotPublished { .. })
    }
}

/// Source of daily threshold snapshots.
pub trait SnapshotFetcher: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch the snapshot published for `date`. A successful result is never empty.
    fn fetch(&self, date: NaiveDate) -> Result<Snapshot, FetchError>;
}
