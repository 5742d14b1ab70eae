//! History updater — fills in missing trading days and prunes stale ones.
//!
//! Only dates that are not yet keys in the history are fetched. A date whose
//! fetch fails (or whose file is not yet published) is left unwritten, so the
//! next run tries it again. The update as a whole never fails.

use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::calendar::prev_trading_days;
use crate::data::provider::{FetchError, SnapshotFetcher};
use crate::data::store::SnapshotStore;
use crate::domain::{DateKey, History};
use crate::policy::{FETCH_MARGIN_DAYS, MAX_LOOKBACK_CAL, MAX_STREAK_DAYS};

/// Pause between consecutive upstream requests within one run.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(250);

/// Counts from one update run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub candidates: usize,
    pub already_present: usize,
    pub fetched: usize,
    pub unavailable: usize,
    pub pruned: usize,
    pub saved: bool,
}

/// Progress callbacks for an update run.
pub trait UpdateProgress: Send {
    /// Called before each upstream request.
    fn on_fetch(&self, date: &DateKey, index: usize, total: usize);

    /// Called with the number of symbols fetched, or why the date was skipped.
    fn on_result(&self, date: &DateKey, result: &Result<usize, FetchError>);

    /// Called once the history is pruned and persisted.
    fn on_complete(&self, summary: &UpdateSummary);
}

/// Progress reporter that writes to the tracing log.
pub struct LogProgress;

impl UpdateProgress for LogProgress {
    fn on_fetch(&self, date: &DateKey, index: usize, total: usize) {
        debug!(%date, index = index + 1, total, "fetching threshold file");
    }

    fn on_result(&self, date: &DateKey, result: &Result<usize, FetchError>) {
        match result {
            Ok(count) => info!(%date, symbols = count, "[+] threshold file stored"),
            Err(e) if e.is_not_published() => debug!(%date, "file not published yet"),
            Err(e) => debug!(%date, error = %e, "threshold file unavailable"),
        }
    }

    fn on_complete(&self, summary: &UpdateSummary) {
        info!(
            fetched = summary.fetched,
            unavailable = summary.unavailable,
            pruned = summary.pruned,
            "history update complete"
        );
    }
}

/// Result of [`HistoryUpdater::run`].
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub history: History,
    pub summary: UpdateSummary,
}

/// Walks recent trading days and fetches the ones the store lacks.
pub struct HistoryUpdater<'a> {
    fetcher: &'a dyn SnapshotFetcher,
    store: &'a dyn SnapshotStore,
    request_delay: Duration,
}

impl<'a> HistoryUpdater<'a> {
    pub fn new(fetcher: &'a dyn SnapshotFetcher, store: &'a dyn SnapshotStore) -> Self {
        Self {
            fetcher,
            store,
            request_delay: DEFAULT_REQUEST_DELAY,
        }
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Update the stored history as of `today` and return it.
    pub fn update_history(&self, today: NaiveDate) -> History {
        self.run(today, &LogProgress).history
    }

    /// Update with explicit progress reporting.
    pub fn run(&self, today: NaiveDate, progress: &dyn UpdateProgress) -> UpdateOutcome {
        let mut history = self.store.load();
        let candidates = prev_trading_days(today, MAX_STREAK_DAYS + FETCH_MARGIN_DAYS);

        let missing: Vec<DateKey> = candidates
            .iter()
            .map(|d| DateKey::from_date(*d))
            .filter(|key| !history.contains(key))
            .collect();

        let mut summary = UpdateSummary {
            candidates: candidates.len(),
            already_present: candidates.len() - missing.len(),
            ..Default::default()
        };

        let total = missing.len();
        info!(source = self.fetcher.name(), %today, missing = total, "updating history");
        for (i, key) in missing.into_iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                thread::sleep(self.request_delay);
            }
            progress.on_fetch(&key, i, total);

            let result = self.fetcher.fetch(key.to_date());
            let reported = result.as_ref().map(|snapshot| snapshot.len()).map_err(|e| e.clone());
            progress.on_result(&key, &reported);

            match result {
                Ok(snapshot) if !snapshot.is_empty() => {
                    history.insert(key, snapshot);
                    summary.fetched += 1;
                }
                // An empty success is treated like "not published": leave the key unwritten.
                Ok(_) | Err(_) => summary.unavailable += 1,
            }
        }

        summary.pruned = history.prune_before(&retention_cutoff(today));

        match self.store.save(&history) {
            Ok(()) => summary.saved = true,
            Err(e) => warn!(error = %e, "failed to persist history; keeping in-memory result"),
        }

        progress.on_complete(&summary);
        UpdateOutcome { history, summary }
    }
}

/// Oldest date key kept after pruning.
pub fn retention_cutoff(today: NaiveDate) -> DateKey {
    let days = i64::from(MAX_LOOKBACK_CAL) + FETCH_MARGIN_DAYS as i64;
    DateKey::from_date(today - chrono::Duration::days(days))
}
