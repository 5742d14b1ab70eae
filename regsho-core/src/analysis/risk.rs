//! Risk tiers and deadline arithmetic.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::policy::{CLOSEOUT_DAYS, DANGER_STREAK, WARNING_STREAK};

/// Closeout risk tier. A pure, total function of the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Safe,
    Warning,
    Danger,
}

impl RiskTier {
    pub fn from_streak(streak: u32) -> Self {
        if streak >= DANGER_STREAK {
            RiskTier::Danger
        } else if streak >= WARNING_STREAK {
            RiskTier::Warning
        } else {
            RiskTier::Safe
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::Safe => "safe",
            RiskTier::Warning => "warning",
            RiskTier::Danger => "danger",
        }
    }

    /// Upper-cased form used in tabular export.
    pub fn label(self) -> &'static str {
        match self {
            RiskTier::Safe => "SAFE",
            RiskTier::Warning => "WARNING",
            RiskTier::Danger => "DANGER",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress toward the closeout deadline, as a whole percentage capped at 100.
///
/// `round(streak / CLOSEOUT_DAYS * 100)` in integer arithmetic. With a
/// horizon of 13 the quotient never lands on an exact half, so round-half-up
/// and round-half-even agree.
pub fn deadline_pct(streak: u32) -> u32 {
    let pct = (streak * 200 + CLOSEOUT_DAYS) / (2 * CLOSEOUT_DAYS);
    pct.min(100)
}

/// Trading days left before the closeout deadline, floored at zero.
pub fn days_remaining(streak: u32) -> u32 {
    CLOSEOUT_DAYS.saturating_sub(streak)
}
