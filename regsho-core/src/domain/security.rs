//! Per-security metadata carried in each daily snapshot.

use serde::{Deserialize, Serialize};

/// Ticker symbol. Case-sensitive.
pub type Symbol = String;

/// Rule 3210 flag as published in the threshold file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RuleFlag {
    Y,
    #[default]
    N,
}

impl RuleFlag {
    /// Interpret a raw field. Only an exact `Y` sets the flag.
    pub fn from_field(field: &str) -> Self {
        if field.trim() == "Y" {
            RuleFlag::Y
        } else {
            RuleFlag::N
        }
    }

    pub fn is_set(self) -> bool {
        self == RuleFlag::Y
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuleFlag::Y => "Y",
            RuleFlag::N => "N",
        }
    }
}

/// Metadata for one listed security. Missing fields default to neutral values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub market: String,
    #[serde(default, rename = "rule3210")]
    pub rule_flag: RuleFlag,
}

impl SecurityInfo {
    pub fn market_label(&self) -> &str {
        market_label(&self.market)
    }
}

/// Human-readable Nasdaq market tier. Unknown codes label as themselves.
pub fn market_label(code: &str) -> &str {
    match code {
        "G" => "Global Select",
        "S" => "Capital Market",
        "Q" => "Global Market",
        other => other,
    }
}
