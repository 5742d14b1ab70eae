//! Per-symbol presence query, read straight from the history.

use serde::{Deserialize, Serialize};

use crate::domain::{History, Symbol};
use crate::policy::DISPLAY_FLAGS;

use super::result::HistoryFlag;

/// Presence of one symbol over the most recent valid dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolHistory {
    pub symbol: Symbol,
    /// Most recent first.
    pub history: Vec<HistoryFlag>,
}

impl SymbolHistory {
    pub fn listed_days(&self) -> usize {
        self.history.iter().filter(|f| f.present).count()
    }

    /// Consecutive presences from the most recent date.
    pub fn current_streak(&self) -> usize {
        self.history.iter().take_while(|f| f.present).count()
    }
}

/// Presence flags for `symbol` over the last 30 valid dates.
///
/// The query symbol is upper-cased, matching how the exchange publishes tickers.
pub fn symbol_history(history: &History, symbol: &str) -> SymbolHistory {
    let symbol = symbol.trim().to_uppercase();
    let flags = history
        .valid_dates()
        .into_iter()
        .take(DISPLAY_FLAGS)
        .map(|date| HistoryFlag {
            present: history.is_listed(date, &symbol),
            date: date.clone(),
        })
        .collect();

    SymbolHistory {
        symbol,
        history: flags,
    }
}
