//! Consecutive-presence walks over the valid-date list.

use crate::domain::{DateKey, History};

use super::result::HistoryFlag;

/// Outcome of walking one symbol back through the valid dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakWalk {
    /// Consecutive presences counted from the first date walked.
    pub streak: u32,
    /// Presence on every date walked, including dates past the break.
    pub trace: Vec<HistoryFlag>,
}

/// Walk up to `limit` of `dates` (most recent first) for `symbol`.
///
/// Counting stops at the first date the symbol is absent; the trace keeps
/// going to the walk limit so recent re-listings stay visible.
pub fn walk_streak(history: &History, dates: &[&DateKey], symbol: &str, limit: usize) -> StreakWalk {
    let mut streak = 0;
    let mut broken = false;
    let mut trace = Vec::with_capacity(limit.min(dates.len()));

    for date in dates.iter().take(limit) {
        let present = history.is_listed(date, symbol);
        if !broken {
            if present {
                streak += 1;
            } else {
                broken = true;
            }
        }
        trace.push(HistoryFlag {
            date: (*date).clone(),
            present,
        });
    }

    StreakWalk { streak, trace }
}

/// Streak only, without building a trace.
pub fn consecutive_presence(history: &History, dates: &[&DateKey], symbol: &str, limit: usize) -> u32 {
    dates
        .iter()
        .take(limit)
        .take_while(|date| history.is_listed(date, symbol))
        .count() as u32
}
