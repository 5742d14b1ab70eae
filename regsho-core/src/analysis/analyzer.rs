//! Streak analyzer.
//!
//! Reads a history and produces, for the most recent populated date:
//! - every listed security with streak, deadline progress and risk tier
//! - the added/removed diff against the previous populated date
//! - summary counts
//!
//! Only non-empty snapshots count as dates. An empty or missing day is an
//! invisible gap; a streak breaks only when the symbol is absent from a
//! populated day.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{DateKey, History, Snapshot, Symbol};
use crate::policy::{DISPLAY_FLAGS, MARKET_TZ, MAX_STREAK_DAYS};

use super::result::{AnalysisResult, RemovalRecord, SecurityRecord, Summary};
use super::risk::{days_remaining, deadline_pct, RiskTier};
use super::streak::{consecutive_presence, walk_streak};

/// Analyze `history`, stamping the result with the current time.
///
/// Returns `None` when no date has a non-empty snapshot.
pub fn analyze(history: &History) -> Option<AnalysisResult> {
    analyze_at(history, Utc::now())
}

/// Analyze `history` with an explicit `last_updated` instant.
///
/// Two calls with the same history and instant return equal results.
pub fn analyze_at(history: &History, now: DateTime<Utc>) -> Option<AnalysisResult> {
    let valid_dates = history.valid_dates();
    let ref_date = *valid_dates.first()?;
    let prev_date = valid_dates.get(1).copied();

    let empty = Snapshot::new();
    let today = history.get(ref_date).unwrap_or(&empty);
    let prev = prev_date.and_then(|d| history.get(d)).unwrap_or(&empty);

    // New-symbol detection needs a genuine prior date to diff against.
    let added_today: Vec<Symbol> = match prev_date {
        Some(_) => today
            .keys()
            .filter(|symbol| !prev.contains_key(*symbol))
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    let mut securities: Vec<SecurityRecord> = today
        .iter()
        .map(|(symbol, info)| {
            let walk = walk_streak(history, &valid_dates, symbol, MAX_STREAK_DAYS);
            let streak = walk.streak;
            let first_date = streak_start(&valid_dates, streak).unwrap_or(ref_date);

            let mut history_flags = walk.trace;
            history_flags.truncate(DISPLAY_FLAGS);

            SecurityRecord {
                symbol: symbol.clone(),
                name: info.name.clone(),
                market: info.market.clone(),
                market_label: info.market_label().to_string(),
                rule_flag: info.rule_flag,
                streak,
                days_remaining: days_remaining(streak),
                pct: deadline_pct(streak),
                risk: RiskTier::from_streak(streak),
                first_date: first_date.clone(),
                is_new: prev_date.is_some() && !prev.contains_key(symbol),
                history_flags,
            }
        })
        .collect();

    securities.sort_by(|a, b| {
        b.streak
            .cmp(&a.streak)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    // The symbol is gone from the reference date, so its streak is counted
    // from the most recent date it was still listed.
    let earlier_dates = valid_dates.get(1..).unwrap_or_default();
    let removed_today: Vec<RemovalRecord> = prev
        .iter()
        .filter(|(symbol, _)| prev_date.is_some() && !today.contains_key(*symbol))
        .map(|(symbol, info)| RemovalRecord {
            symbol: symbol.clone(),
            name: info.name.clone(),
            market: info.market.clone(),
            market_label: info.market_label().to_string(),
            rule_flag: info.rule_flag,
            streak_at_removal: consecutive_presence(history, earlier_dates, symbol, MAX_STREAK_DAYS),
        })
        .collect();

    let summary = Summary::tally(&securities, added_today.len(), removed_today.len());

    debug!(
        ref_date = %ref_date,
        total = summary.total,
        danger = summary.danger,
        added = summary.new_today,
        removed = summary.removed_today,
        "analysis complete"
    );

    Some(AnalysisResult {
        securities,
        added_today,
        removed_today,
        ref_date: ref_date.clone(),
        prev_date: prev_date.cloned(),
        summary,
        last_updated: format_last_updated(now),
    })
}

/// Date the current streak began: `valid_dates[streak - 1]`, or the oldest
/// valid date when that index does not exist.
fn streak_start<'a>(valid_dates: &[&'a DateKey], streak: u32) -> Option<&'a DateKey> {
    (streak as usize)
        .checked_sub(1)
        .and_then(|i| valid_dates.get(i))
        .or_else(|| valid_dates.last())
        .copied()
}

fn format_last_updated(now: DateTime<Utc>) -> String {
    now.with_timezone(&MARKET_TZ)
        .format("%Y-%m-%d %H:%M:%S ET")
        .to_string()
}
