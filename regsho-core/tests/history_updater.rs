//! Integration tests for the history updater.
//!
//! A scripted fetcher stands in for the Nasdaq provider: it serves canned
//! snapshots for some dates, fails for others, and records every request.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use regsho_core::data::{FetchError, JsonHistoryStore, MemoryHistoryStore, SnapshotFetcher, SnapshotStore};
use regsho_core::domain::{DateKey, History, SecurityInfo, Snapshot};
use regsho_core::updater::{retention_cutoff, HistoryUpdater, UpdateProgress, UpdateSummary};

// ── Helpers ──────────────────────────────────────────────────────────

struct ScriptedFetcher {
    served: HashMap<NaiveDate, Snapshot>,
    requests: Mutex<Vec<NaiveDate>>,
    requested_at: Mutex<Vec<Instant>>,
}

impl ScriptedFetcher {
    fn new(served: &[(NaiveDate, &[&str])]) -> Self {
        Self {
            served: served
                .iter()
                .map(|(d, symbols)| (*d, snapshot(symbols)))
                .collect(),
            requests: Mutex::new(Vec::new()),
            requested_at: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<NaiveDate> {
        self.requests.lock().unwrap().clone()
    }
}

impl SnapshotFetcher for ScriptedFetcher {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch(&self, date: NaiveDate) -> Result<Snapshot, FetchError> {
        self.requested_at.lock().unwrap().push(Instant::now());
        self.requests.lock().unwrap().push(date);
        match self.served.get(&date) {
            Some(snapshot) => Ok(snapshot.clone()),
            None => Err(FetchError::HttpStatus {
                status: 404,
                date: DateKey::from_date(date),
            }),
        }
    }
}

struct CountingProgress {
    fetches: Mutex<usize>,
    completed: Mutex<Option<UpdateSummary>>,
}

impl UpdateProgress for CountingProgress {
    fn on_fetch(&self, _date: &DateKey, _index: usize, _total: usize) {
        *self.fetches.lock().unwrap() += 1;
    }

    fn on_result(&self, _date: &DateKey, _result: &Result<usize, FetchError>) {}

    fn on_complete(&self, summary: &UpdateSummary) {
        *self.completed.lock().unwrap() = Some(summary.clone());
    }
}

fn snapshot(symbols: &[&str]) -> Snapshot {
    symbols
        .iter()
        .map(|s| (s.to_string(), SecurityInfo::default()))
        .collect()
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// Friday
fn today() -> NaiveDate {
    d(2024, 5, 10)
}

// ── Tests ────────────────────────────────────────────────────────────

#[test]
fn fetches_missing_dates_and_skips_failures() {
    let fetcher = ScriptedFetcher::new(&[
        (d(2024, 5, 9), &["AAA", "BBB"]),
        (d(2024, 5, 8), &["AAA"]),
    ]);
    let store = MemoryHistoryStore::default();
    let updater = HistoryUpdater::new(&fetcher, &store).with_request_delay(Duration::ZERO);

    let history = updater.update_history(today());

    assert_eq!(history.len(), 2);
    assert!(history.contains(&DateKey::from_date(d(2024, 5, 9))));
    // Today's file was not served: no key, so it is retried next run.
    assert!(!history.contains(&DateKey::from_date(today())));
    // 70 weekday candidates, all missing initially
    assert_eq!(fetcher.requests().len(), 70);
    assert!(fetcher.requests().iter().all(|d| regsho_core::calendar::is_weekday(*d)));
    assert_eq!(store.snapshot(), history);
}

#[test]
fn present_dates_are_not_refetched() {
    let existing: History = [(DateKey::from_date(d(2024, 5, 9)), snapshot(&["OLD"]))]
        .into_iter()
        .collect();
    let store = MemoryHistoryStore::new(existing);
    let fetcher = ScriptedFetcher::new(&[(d(2024, 5, 9), &["NEW"]), (d(2024, 5, 10), &["AAA"])]);
    let updater = HistoryUpdater::new(&fetcher, &store).with_request_delay(Duration::ZERO);

    let history = updater.update_history(today());

    assert!(!fetcher.requests().contains(&d(2024, 5, 9)));
    assert_eq!(fetcher.requests().len(), 69);
    let may9 = history.get(&DateKey::from_date(d(2024, 5, 9))).unwrap();
    assert!(may9.contains_key("OLD"));
    assert!(history.contains(&DateKey::from_date(today())));
}

#[test]
fn second_run_retries_only_failed_dates() {
    let fetcher = ScriptedFetcher::new(&[(d(2024, 5, 9), &["AAA"])]);
    let store = MemoryHistoryStore::default();
    let updater = HistoryUpdater::new(&fetcher, &store).with_request_delay(Duration::ZERO);

    updater.update_history(today());
    let first_run = fetcher.requests().len();
    updater.update_history(today());
    let second_run = fetcher.requests().len() - first_run;

    assert_eq!(first_run, 70);
    assert_eq!(second_run, 69);
}

#[test]
fn prunes_keys_older_than_retention() {
    let stale = DateKey::from_date(d(2023, 12, 1));
    let edge = retention_cutoff(today());
    let existing: History = [
        (stale.clone(), snapshot(&["OLD"])),
        (edge.clone(), snapshot(&["EDGE"])),
    ]
    .into_iter()
    .collect();
    let store = MemoryHistoryStore::new(existing);
    let fetcher = ScriptedFetcher::new(&[]);
    let progress = CountingProgress {
        fetches: Mutex::new(0),
        completed: Mutex::new(None),
    };

    let outcome = HistoryUpdater::new(&fetcher, &store)
        .with_request_delay(Duration::ZERO)
        .run(today(), &progress);

    assert!(!outcome.history.contains(&stale));
    assert!(outcome.history.contains(&edge));
    assert_eq!(outcome.summary.pruned, 1);
    assert_eq!(outcome.summary.unavailable, 70);
    assert_eq!(outcome.summary.fetched, 0);
    assert!(outcome.summary.saved);
    assert_eq!(*progress.fetches.lock().unwrap(), 70);
    assert_eq!(progress.completed.lock().unwrap().as_ref(), Some(&outcome.summary));
}

#[test]
fn unwritable_store_still_returns_history() {
    let tmp = tempfile::TempDir::new().unwrap();
    // A regular file where the data directory should be makes every save fail.
    let blocker = tmp.path().join("blocked");
    std::fs::write(&blocker, "not a directory").unwrap();
    let store = JsonHistoryStore::new(&blocker);
    let fetcher = ScriptedFetcher::new(&[(d(2024, 5, 10), &["AAA"])]);
    let updater = HistoryUpdater::new(&fetcher, &store).with_request_delay(Duration::ZERO);

    let outcome = updater.run(today(), &regsho_core::updater::LogProgress);

    assert!(!outcome.summary.saved);
    assert_eq!(outcome.history.len(), 1);
    assert!(store.load().is_empty());
}

#[test]
fn json_store_persists_between_runs() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = JsonHistoryStore::new(tmp.path());
    let fetcher = ScriptedFetcher::new(&[(d(2024, 5, 10), &["AAA"]), (d(2024, 5, 9), &["AAA"])]);

    HistoryUpdater::new(&fetcher, &store)
        .with_request_delay(Duration::ZERO)
        .update_history(today());

    let reloaded = JsonHistoryStore::new(tmp.path()).load();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(store.meta().unwrap().valid_date_count, 2);
}

#[test]
fn consecutive_requests_respect_the_delay() {
    let delay = Duration::from_millis(25);
    // Everything but the four most recent candidates is already stored.
    let existing: History = regsho_core::prev_trading_days(today(), 70)
        .into_iter()
        .skip(4)
        .map(|d| (DateKey::from_date(d), snapshot(&["AAA"])))
        .collect();
    let store = MemoryHistoryStore::new(existing);
    let fetcher = ScriptedFetcher::new(&[(d(2024, 5, 10), &["AAA"])]);

    HistoryUpdater::new(&fetcher, &store)
        .with_request_delay(delay)
        .update_history(today());

    let stamps = fetcher.requested_at.lock().unwrap().clone();
    assert_eq!(stamps.len(), 4);
    for pair in stamps.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(gap >= delay, "requests only {gap:?} apart");
    }
}
