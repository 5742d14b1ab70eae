//! Reg SHO Runner — rebuild orchestration around `regsho-core`.
//!
//! This crate provides:
//! - TOML monitor configuration with defaults and validation
//! - Guarded result store (the externally served analysis snapshot)
//! - Rebuild pipeline (update history, analyze, publish)
//! - Rebuild service with a private worker pool and a daily schedule
//! - CSV and JSON export of the published result

pub mod config;
pub mod export;
pub mod rebuild;
pub mod result_store;
pub mod scheduler;

pub use config::{ConfigError, MonitorConfig};
pub use export::{export_csv, export_file_name, export_json, write_export, ExportError, ExportFormat};
pub use rebuild::{RebuildOutcome, RebuildPipeline};
pub use result_store::{ResultStore, ResultStoreError};
pub use scheduler::{next_fire_after, RebuildService, StartupMode};
