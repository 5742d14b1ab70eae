//! Analyzer output types.
//!
//! An `AnalysisResult` is built fresh on every run and replaced wholesale;
//! nothing here is updated in place.

use serde::{Deserialize, Serialize};

use crate::domain::{DateKey, RuleFlag, Symbol};

use super::risk::RiskTier;

/// Presence of a symbol on one valid date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFlag {
    pub date: DateKey,
    pub present: bool,
}

/// One currently listed security with its streak and deadline data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRecord {
    pub symbol: Symbol,
    pub name: String,
    pub market: String,
    pub market_label: String,
    #[serde(rename = "rule3210")]
    pub rule_flag: RuleFlag,
    pub streak: u32,
    pub days_remaining: u32,
    pub pct: u32,
    pub risk: RiskTier,
    /// Date the current streak began (clamped to the walked window).
    pub first_date: DateKey,
    pub is_new: bool,
    /// Most recent first, at most 30 entries.
    pub history_flags: Vec<HistoryFlag>,
}

/// A security that dropped off the list on the reference date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalRecord {
    pub symbol: Symbol,
    pub name: String,
    pub market: String,
    pub market_label: String,
    #[serde(rename = "rule3210")]
    pub rule_flag: RuleFlag,
    pub streak_at_removal: u32,
}

/// Aggregate counts over the securities list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub danger: usize,
    pub warning: usize,
    pub safe: usize,
    pub total: usize,
    #[serde(rename = "rule3210")]
    pub rule_flagged: usize,
    pub new_today: usize,
    pub removed_today: usize,
}

impl Summary {
    pub fn tally(securities: &[SecurityRecord], added: usize, removed: usize) -> Self {
        let mut summary = Summary {
            total: securities.len(),
            new_today: added,
            removed_today: removed,
            ..Default::default()
        };
        for security in securities {
            match security.risk {
                RiskTier::Danger => summary.danger += 1,
                RiskTier::Warning => summary.warning += 1,
                RiskTier::Safe => summary.safe += 1,
            }
            if security.rule_flag.is_set() {
                summary.rule_flagged += 1;
            }
        }
        summary
    }
}

/// Full analyzer output for the most recent populated date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Streak descending, then symbol ascending.
    pub securities: Vec<SecurityRecord>,
    /// Sorted ascending.
    pub added_today: Vec<Symbol>,
    /// Sorted ascending by symbol.
    pub removed_today: Vec<RemovalRecord>,
    pub ref_date: DateKey,
    pub prev_date: Option<DateKey>,
    pub summary: Summary,
    /// `YYYY-MM-DD HH:MM:SS ET`
    pub last_updated: String,
}

impl AnalysisResult {
    pub fn security(&self, symbol: &str) -> Option<&SecurityRecord> {
        self.securities.iter().find(|s| s.symbol == symbol)
    }

    pub fn removal(&self, symbol: &str) -> Option<&RemovalRecord> {
        self.removed_today.iter().find(|r| r.symbol == symbol)
    }

    /// Suggested file name for a tabular export of this result.
    pub fn export_file_stem(&self) -> String {
        format!("regsho_{}", self.ref_date)
    }
}
