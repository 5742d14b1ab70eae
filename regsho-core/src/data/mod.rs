//! Data collaborators: raw file parsing, fetching and snapshot persistence.

pub mod nasdaq;
pub mod parse;
pub mod provider;
pub mod store;

pub use nasdaq::NasdaqProvider;
pub use parse::{parse_response_body, parse_threshold_file};
pub use provider::{FetchError, SnapshotFetcher};
pub use store::{HistoryMeta, JsonHistoryStore, MemoryHistoryStore, SnapshotStore, StoreError};
