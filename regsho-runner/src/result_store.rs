//! Guarded store for the most recent analysis result.
//!
//! One file (`cache.json`) behind one mutex. Writers replace the file
//! atomically (temp file + rename) while holding the guard, so a reader
//! sees either the previous result or the new one, never a partial write.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};

use regsho_core::AnalysisResult;

const RESULT_FILE: &str = "cache.json";

#[derive(Debug, Error)]
pub enum ResultStoreError {
    /// No result has been written yet, or the stored one is unreadable.
    #[error("analysis result not ready yet")]
    NotReady,

    #[error("result store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("result serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ResultStoreError {
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady)
    }
}

/// The externally served analysis snapshot.
pub struct ResultStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl ResultStore {
    /// Store backed by `{data_dir}/cache.json`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self::at_path(data_dir.as_ref().join(RESULT_FILE))
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current result, or [`ResultStoreError::NotReady`].
    pub fn load(&self) -> Result<AnalysisResult, ResultStoreError> {
        let _guard = self.lock();

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ResultStoreError::NotReady)
            }
            Err(source) => {
                return Err(ResultStoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "stored result is unreadable");
            ResultStoreError::NotReady
        })
    }

    /// Replace the stored result.
    pub fn save(&self, result: &AnalysisResult) -> Result<(), ResultStoreError> {
        let json = serde_json::to_string_pretty(result)?;
        let _guard = self.lock();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ResultStoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|source| ResultStoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;

        if let Err(source) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(ResultStoreError::Io {
                path: self.path.clone(),
                source,
            });
        }

        debug!(ref_date = %result.ref_date, securities = result.securities.len(), "result saved");
        Ok(())
    }

    /// Whether a readable result is present.
    pub fn has_result(&self) -> bool {
        self.load().is_ok()
    }
}
