//! Parser for the pipe-delimited Nasdaq threshold file.
//!
//! Layout: one header line, then `Symbol|Security Name|Market Category|
//! Reg SHO Threshold Flag|Rule 3210|...` rows, then a trailer row whose first
//! field is a numeric file-creation timestamp.

use crate::domain::{DateKey, RuleFlag, SecurityInfo, Snapshot};

use super::provider::FetchError;

const DELIMITER: char = '|';
const MIN_FIELDS: usize = 4;

/// Parse a raw threshold file into a snapshot.
///
/// Rows with fewer than four fields, an empty symbol, or a numeric trailer
/// stamp are skipped. Missing metadata fields fall back to neutral values.
pub fn parse_threshold_file(text: &str) -> Snapshot {
    let mut snapshot = Snapshot::new();

    for line in text.trim().lines().skip(1) {
        let fields: Vec<&str> = line.split(DELIMITER).collect();
        if fields.len() < MIN_FIELDS {
            continue;
        }

        let symbol = fields[0].trim();
        if symbol.is_empty() || is_timestamp_row(symbol) {
            continue;
        }

        snapshot.insert(
            symbol.to_string(),
            SecurityInfo {
                name: fields[1].trim().to_string(),
                market: fields[2].trim().to_string(),
                rule_flag: fields.get(4).map_or(RuleFlag::N, |f| RuleFlag::from_field(f)),
            },
        );
    }

    snapshot
}

/// Validate a response body for `date` and parse it.
///
/// A body without the delimiter is garbage (an error page, say). A body with
/// the delimiter but no rows is a file that exists but has not been filled in.
pub fn parse_response_body(date: &DateKey, body: &str) -> Result<Snapshot, FetchError> {
    if !body.contains(DELIMITER) {
        return Err(FetchError::MissingDelimiter { date: date.clone() });
    }
    let snapshot = parse_threshold_file(body);
    if snapshot.is_empty() {
        return Err(FetchError::NotPublished { date: date.clone() });
    }
    Ok(snapshot)
}

// The trailer carries a timestamp like `20240105223001` in the symbol column.
fn is_timestamp_row(symbol: &str) -> bool {
    symbol.chars().take(8).all(|c| c.is_ascii_digit())
}
