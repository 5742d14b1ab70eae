//! Trading-day sequence.
//!
//! Weekdays only: there is no holiday calendar. A holiday simply yields a
//! date with no published file, which the updater and analyzer tolerate.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::policy::MAX_LOOKBACK_CAL;

pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Up to `n` weekdays walking backward from `start` (inclusive), most recent first.
///
/// The search examines at most [`MAX_LOOKBACK_CAL`] calendar days, so the
/// result can be shorter than `n`.
pub fn prev_trading_days(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    prev_trading_days_within(start, n, MAX_LOOKBACK_CAL)
}

/// [`prev_trading_days`] with an explicit calendar-day search budget.
pub fn prev_trading_days_within(start: NaiveDate, n: usize, budget: u32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(n);
    let mut cur = start;
    let mut checked = 0;

    while days.len() < n && checked < budget {
        if is_weekday(cur) {
            days.push(cur);
        }
        checked += 1;
        match cur.pred_opt() {
            Some(prev) => cur = prev,
            None => break,
        }
    }

    days
}
