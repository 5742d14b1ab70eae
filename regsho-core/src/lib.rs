//! Reg SHO Core — threshold-list history and streak analysis.
//!
//! This crate contains the engine of the threshold monitor:
//! - Domain types (date keys, securities, daily snapshots, history)
//! - Trading-day sequence (weekdays only, bounded backward search)
//! - Data collaborators (raw file parsing, Nasdaq fetcher, snapshot store)
//! - History updater (fetch missing days, prune stale ones)
//! - Streak analyzer (consecutive-presence streaks, risk tiers, daily diff)

pub mod analysis;
pub mod calendar;
pub mod data;
pub mod domain;
pub mod policy;
pub mod updater;

pub use analysis::{analyze, analyze_at, symbol_history, AnalysisResult, RiskTier};
pub use calendar::prev_trading_days;
pub use domain::{DateKey, History, RuleFlag, SecurityInfo, Snapshot, Symbol};
pub use updater::{HistoryUpdater, UpdateSummary};
