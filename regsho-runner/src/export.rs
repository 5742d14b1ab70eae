//! Export of the published result as CSV or JSON.
//!
//! The CSV layout is a flat table, one row per listed security, in the
//! result's ranking order:
//!
//! `Symbol, Name, Market, Streak(Days), Days Remaining, Risk, First Listed,
//! % to Deadline, Rule 3210`

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::info;

use regsho_core::AnalysisResult;

pub const CSV_HEADER: [&str; 9] = [
    "Symbol",
    "Name",
    "Market",
    "Streak(Days)",
    "Days Remaining",
    "Risk",
    "First Listed",
    "% to Deadline",
    "Rule 3210",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write export to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV output is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("unknown export format '{0}' (expected csv or json)")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Ranked securities table as CSV text.
pub fn export_csv(result: &AnalysisResult) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for s in &result.securities {
        wtr.write_record([
            s.symbol.as_str(),
            s.name.as_str(),
            s.market_label.as_str(),
            s.streak.to_string().as_str(),
            s.days_remaining.to_string().as_str(),
            s.risk.label(),
            s.first_date.iso().as_str(),
            format!("{}%", s.pct).as_str(),
            s.rule_flag.as_str(),
        ])?;
    }

    let data = wtr.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8(data)?)
}

/// Full result as pretty-printed JSON.
pub fn export_json(result: &AnalysisResult) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(result)?)
}

pub fn render(result: &AnalysisResult, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Csv => export_csv(result),
        ExportFormat::Json => export_json(result),
    }
}

/// `regsho_{YYYYMMDD}.{ext}` for the result's reference date.
pub fn export_file_name(result: &AnalysisResult, format: ExportFormat) -> String {
    format!("{}.{}", result.export_file_stem(), format.extension())
}

/// Write the export and return the path written.
///
/// `output` may be a file path or an existing directory; with no `output`
/// the suggested file name is used in the current directory.
pub fn write_export(
    result: &AnalysisResult,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<PathBuf, ExportError> {
    let path = match output {
        Some(p) if p.is_dir() => p.join(export_file_name(result, format)),
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(export_file_name(result, format)),
    };

    let body = render(result, format)?;
    std::fs::write(&path, body).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), %format, rows = result.securities.len(), "export written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regsho_core::analysis::{HistoryFlag, RiskTier, SecurityRecord, Summary};
    use regsho_core::RuleFlag;

    fn record(symbol: &str, streak: u32, risk: RiskTier, pct: u32) -> SecurityRecord {
        SecurityRecord {
            symbol: symbol.into(),
            name: format!("{symbol}, Inc. Common Stock"),
            market: "S".into(),
            market_label: "Capital Market".into(),
            rule_flag: RuleFlag::Y,
            streak,
            days_remaining: 13u32.saturating_sub(streak),
            pct,
            risk,
            first_date: "20240102".parse().unwrap(),
            is_new: false,
            history_flags: vec![HistoryFlag {
                date: "20240105".parse().unwrap(),
                present: true,
            }],
        }
    }

    fn sample() -> AnalysisResult {
        AnalysisResult {
            securities: vec![
                record("DNGR", 12, RiskTier::Danger, 92),
                record("SAFE", 2, RiskTier::Safe, 15),
            ],
            added_today: Vec::new(),
            removed_today: Vec::new(),
            ref_date: "20240105".parse().unwrap(),
            prev_date: None,
            summary: Summary::default(),
            last_updated: "2024-01-05 22:30:00 ET".into(),
        }
    }

    #[test]
    fn csv_has_header_and_formatted_rows() {
        let csv = export_csv(&sample()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Symbol,Name,Market,Streak(Days),Days Remaining,Risk,First Listed,% to Deadline,Rule 3210"
        );
        assert_eq!(
            lines[1],
            "DNGR,\"DNGR, Inc. Common Stock\",Capital Market,12,1,DANGER,2024-01-02,92%,Y"
        );
        assert!(lines[2].starts_with("SAFE,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn file_name_uses_reference_date() {
        assert_eq!(export_file_name(&sample(), ExportFormat::Csv), "regsho_20240105.csv");
        assert_eq!(export_file_name(&sample(), ExportFormat::Json), "regsho_20240105.json");
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn json_export_roundtrips() {
        let json = export_json(&sample()).unwrap();
        let back: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn write_export_into_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_export(&sample(), ExportFormat::Csv, Some(tmp.path())).unwrap();
        assert_eq!(path, tmp.path().join("regsho_20240105.csv"));
        assert!(std::fs::read_to_string(path).unwrap().contains("DANGER"));
    }
}
