//! Snapshot store: persistence of the date → snapshot history.
//!
//! Layout: `{data_dir}/history.json` plus a `history.meta.json` sidecar.
//!
//! Features:
//! - Atomic writes (unique temp file in the data dir, renamed into place)
//! - Writers are serialized; concurrent rebuilds never interleave a save
//! - Corrupt files are quarantined (`history.json.quarantined`) and read as empty
//! - Metadata sidecar (date range, valid-date count, content hash)

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{DateKey, History};

const HISTORY_FILE: &str = "history.json";
const META_FILE: &str = "history.meta.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persistence boundary for the history mapping.
///
/// `load` never fails: a missing or unreadable store is an empty history.
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> History;

    fn save(&self, history: &History) -> Result<(), StoreError>;
}

/// Metadata sidecar written next to the history file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMeta {
    pub date_count: usize,
    pub valid_date_count: usize,
    pub first_date: Option<DateKey>,
    pub last_date: Option<DateKey>,
    pub data_hash: String,
    pub saved_at: chrono::NaiveDateTime,
}

impl HistoryMeta {
    pub fn describe(history: &History) -> Result<Self, StoreError> {
        let range = history.date_range();
        Ok(Self {
            date_count: history.len(),
            valid_date_count: history.valid_dates().len(),
            first_date: range.map(|(first, _)| first.clone()),
            last_date: range.map(|(_, last)| last.clone()),
            data_hash: content_hash(history)?,
            saved_at: chrono::Local::now().naive_local(),
        })
    }
}

/// blake3 hash of the compact JSON encoding.
pub fn content_hash(history: &History) -> Result<String, StoreError> {
    let bytes = serde_json::to_vec(history)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// JSON-file history store.
///
/// One instance may be shared by every rebuild worker; `load` and `save`
/// both run under `guard`.
pub struct JsonHistoryStore {
    data_dir: PathBuf,
    guard: Mutex<()>,
}

impl JsonHistoryStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE)
    }

    fn meta_path(&self) -> PathBuf {
        self.data_dir.join(META_FILE)
    }

    /// Metadata from the last successful save, if readable.
    pub fn meta(&self) -> Option<HistoryMeta> {
        let content = fs::read_to_string(self.meta_path()).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Write `contents` to a fresh temp file next to `path`, then rename it
    /// over `path`. The temp file is removed if anything fails.
    fn write_atomic(&self, path: &Path, contents: &str) -> Result<(), StoreError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StoreError::Io { path, source }
        };

        let mut tmp =
            tempfile::NamedTempFile::new_in(&self.data_dir).map_err(io_err(&self.data_dir))?;
        tmp.write_all(contents.as_bytes()).map_err(io_err(tmp.path()))?;
        tmp.as_file().sync_all().map_err(io_err(tmp.path()))?;
        tmp.persist(path).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e.error,
        })?;
        Ok(())
    }

    fn quarantine(&self, path: &Path) {
        let quarantine = path.with_extension("json.quarantined");
        if let Err(e) = fs::rename(path, &quarantine) {
            warn!(path = %path.display(), error = %e, "failed to quarantine history file");
        }
    }
}

impl SnapshotStore for JsonHistoryStore {
    fn load(&self) -> History {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let path = self.history_path();
        if !path.exists() {
            debug!(path = %path.display(), "no history file yet");
            return History::new();
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "history file unreadable, starting empty");
                return History::new();
            }
        };

        match serde_json::from_str::<History>(&content) {
            Ok(history) => history,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "quarantining corrupt history file, starting empty"
                );
                self.quarantine(&path);
                History::new()
            }
        }
    }

    fn save(&self, history: &History) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(history)?;
        let meta = HistoryMeta::describe(history)?;
        let meta_json = serde_json::to_string_pretty(&meta)?;

        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        fs::create_dir_all(&self.data_dir).map_err(|source| StoreError::Io {
            path: self.data_dir.clone(),
            source,
        })?;
        self.write_atomic(&self.history_path(), &json)?;
        self.write_atomic(&self.meta_path(), &meta_json)?;

        debug!(dates = history.len(), hash = %meta.data_hash, "history saved");
        Ok(())
    }
}

/// In-memory store for tests and offline runs.
#[derive(Default)]
pub struct MemoryHistoryStore {
    history: Mutex<History>,
}

impl MemoryHistoryStore {
    pub fn new(history: History) -> Self {
        Self {
            history: Mutex::new(history),
        }
    }

    /// Copy of the currently stored history.
    pub fn snapshot(&self) -> History {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SnapshotStore for MemoryHistoryStore {
    fn load(&self) -> History {
        self.snapshot()
    }

    fn save(&self, history: &History) -> Result<(), StoreError> {
        *self.history.lock().unwrap_or_else(PoisonError::into_inner) = history.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SecurityInfo, Snapshot};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn sample_history() -> History {
        let snapshot: Snapshot = [("AAA".to_string(), SecurityInfo::default())]
            .into_iter()
            .collect();
        [
            ("20240104".parse().unwrap(), snapshot.clone()),
            ("20240105".parse().unwrap(), snapshot),
            ("20240103".parse().unwrap(), Snapshot::new()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonHistoryStore::new(tmp.path().join("nested"));
        assert!(store.load().is_empty());
        assert!(store.meta().is_none());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let tmp = TempDir::new().unwrap();
        let store = JsonHistoryStore::new(tmp.path());
        let history = sample_history();

        store.save(&history).unwrap();
        assert_eq!(store.load(), history);

        let mut names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["history.json", "history.meta.json"]);
    }

    #[test]
    fn meta_sidecar_describes_history() {
        let tmp = TempDir::new().unwrap();
        let store = JsonHistoryStore::new(tmp.path());
        let history = sample_history();
        store.save(&history).unwrap();

        let meta = store.meta().unwrap();
        assert_eq!(meta.date_count, 3);
        assert_eq!(meta.valid_date_count, 2);
        assert_eq!(meta.first_date.unwrap().as_str(), "20240103");
        assert_eq!(meta.last_date.unwrap().as_str(), "20240105");
        assert_eq!(meta.data_hash, content_hash(&history).unwrap());
    }

    #[test]
    fn corrupt_file_is_quarantined_and_reads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonHistoryStore::new(tmp.path());
        fs::write(store.history_path(), "{ not json").unwrap();

        assert!(store.load().is_empty());
        assert!(!store.history_path().exists());
        assert!(tmp.path().join("history.json.quarantined").exists());

        // Self-heals on the next write
        store.save(&sample_history()).unwrap();
        assert_eq!(store.load().len(), 3);
    }

    #[test]
    fn malformed_date_key_counts_as_corrupt() {
        let tmp = TempDir::new().unwrap();
        let store = JsonHistoryStore::new(tmp.path());
        fs::write(store.history_path(), r#"{"2024-01-05": {}}"#).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn content_hash_is_deterministic() {
        let a = content_hash(&sample_history()).unwrap();
        let b = content_hash(&sample_history()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, content_hash(&History::new()).unwrap());
    }

    fn history_of(days: u32) -> History {
        let snapshot: Snapshot = [("AAA".to_string(), SecurityInfo::default())]
            .into_iter()
            .collect();
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..days)
            .map(|i| {
                let date = start + chrono::Days::new(u64::from(i));
                (DateKey::from_date(date), snapshot.clone())
            })
            .collect()
    }

    #[test]
    fn concurrent_saves_never_corrupt_the_file() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(JsonHistoryStore::new(tmp.path()));
        let done = Arc::new(AtomicBool::new(false));

        let writers: Vec<_> = [20, 40]
            .into_iter()
            .map(|days| {
                let store = Arc::clone(&store);
                let history = history_of(days);
                thread::spawn(move || {
                    for _ in 0..40 {
                        store.save(&history).unwrap();
                    }
                })
            })
            .collect();

        let reader = {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    let len = store.load().len();
                    assert!(len == 0 || len == 20 || len == 40, "partial history: {len} dates");
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::SeqCst);
        reader.join().unwrap();

        assert!(!tmp.path().join("history.json.quarantined").exists());
        let len = store.load().len();
        assert!(len == 20 || len == 40);
        assert_eq!(store.meta().unwrap().date_count, len);
    }

    #[test]
    fn memory_store_roundtrips() {
        let store = MemoryHistoryStore::default();
        assert!(store.load().is_empty());
        store.save(&sample_history()).unwrap();
        assert_eq!(store.load(), sample_history());
    }
}
