//! Streak analysis over the daily snapshot history.

pub mod analyzer;
pub mod query;
pub mod result;
pub mod risk;
pub mod streak;

pub use analyzer::{analyze, analyze_at};
pub use query::{symbol_history, SymbolHistory};
pub use result::{AnalysisResult, HistoryFlag, RemovalRecord, SecurityRecord, Summary};
pub use risk::{days_remaining, deadline_pct, RiskTier};
pub use streak::{consecutive_presence, walk_streak, StreakWalk};
