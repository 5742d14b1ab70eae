//! Daily snapshots and the dated history built from them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::date_key::DateKey;
use super::security::{SecurityInfo, Symbol};

/// One day's threshold list: symbol → metadata. May be empty.
pub type Snapshot = BTreeMap<Symbol, SecurityInfo>;

/// Date-keyed collection of daily snapshots.
///
/// Serializes as a flat JSON object `{ "YYYYMMDD": { symbol: info } }`.
/// An empty snapshot and a missing key mean the same thing to the analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    days: BTreeMap<DateKey, Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of date keys, including empty snapshots.
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn contains(&self, date: &DateKey) -> bool {
        self.days.contains_key(date)
    }

    pub fn get(&self, date: &DateKey) -> Option<&Snapshot> {
        self.days.get(date)
    }

    pub fn insert(&mut self, date: DateKey, snapshot: Snapshot) -> Option<Snapshot> {
        self.days.insert(date, snapshot)
    }

    /// Whether `symbol` is listed on `date`. Absent dates list nothing.
    pub fn is_listed(&self, date: &DateKey, symbol: &str) -> bool {
        self.days
            .get(date)
            .is_some_and(|snapshot| snapshot.contains_key(symbol))
    }

    /// Dates with a non-empty snapshot, most recent first.
    pub fn valid_dates(&self) -> Vec<&DateKey> {
        self.days
            .iter()
            .rev()
            .filter(|(_, snapshot)| !snapshot.is_empty())
            .map(|(date, _)| date)
            .collect()
    }

    /// Drop every key strictly older than `cutoff`. Returns how many were removed.
    pub fn prune_before(&mut self, cutoff: &DateKey) -> usize {
        let before = self.days.len();
        self.days = self.days.split_off(cutoff);
        before - self.days.len()
    }

    /// Oldest and newest keys, if any.
    pub fn date_range(&self) -> Option<(&DateKey, &DateKey)> {
        let first = self.days.keys().next()?;
        let last = self.days.keys().next_back()?;
        Some((first, last))
    }
}

impl FromIterator<(DateKey, Snapshot)> for History {
    fn from_iter<I: IntoIterator<Item = (DateKey, Snapshot)>>(iter: I) -> Self {
        Self {
            days: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> DateKey {
        s.parse().unwrap()
    }

    fn snapshot(symbols: &[&str]) -> Snapshot {
        symbols
            .iter()
            .map(|s| (s.to_string(), SecurityInfo::default()))
            .collect()
    }

    #[test]
    fn valid_dates_skip_empty_and_sort_descending() {
        let history: History = [
            (key("20240103"), snapshot(&["AAA"])),
            (key("20240105"), snapshot(&["AAA"])),
            (key("20240104"), Snapshot::new()),
        ]
        .into_iter()
        .collect();

        let valid: Vec<&str> = history.valid_dates().iter().map(|k| k.as_str()).collect();
        assert_eq!(valid, vec!["20240105", "20240103"]);
    }

    #[test]
    fn prune_keeps_cutoff_and_newer() {
        let mut history: History = ["20231001", "20231115", "20231120", "20240105"]
            .iter()
            .map(|k| (key(k), snapshot(&["AAA"])))
            .collect();

        let removed = history.prune_before(&key("20231115"));
        assert_eq!(removed, 1);
        assert!(!history.contains(&key("20231001")));
        assert!(history.contains(&key("20231115")));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn is_listed_handles_missing_dates() {
        let history: History = [(key("20240105"), snapshot(&["AAA"]))].into_iter().collect();
        assert!(history.is_listed(&key("20240105"), "AAA"));
        assert!(!history.is_listed(&key("20240105"), "aaa"));
        assert!(!history.is_listed(&key("20240104"), "AAA"));
    }

    #[test]
    fn serializes_as_flat_date_map() {
        let history: History = [(key("20240105"), snapshot(&["AAA"]))].into_iter().collect();
        let json = serde_json::to_string(&history).unwrap();
        assert_eq!(
            json,
            r#"{"20240105":{"AAA":{"name":"","market":"","rule3210":"N"}}}"#
        );
        let back: History = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
    }
}
