//! Fixed policy constants for the threshold monitor.
//!
//! These are regulatory or operational policy, not tunables derived from data.

use chrono_tz::Tz;

/// Calendar-day search budget when walking back for trading days.
pub const MAX_LOOKBACK_CAL: u32 = 120;

/// Maximum number of valid dates walked when computing a streak.
pub const MAX_STREAK_DAYS: usize = 60;

/// Extra candidate days requested (and extra retention days kept) to absorb
/// days with no published file.
pub const FETCH_MARGIN_DAYS: usize = 10;

/// Reg SHO Rule 203(b)(3) forced-closeout horizon, in trading days.
pub const CLOSEOUT_DAYS: u32 = 13;

/// Streak at or above which a security is in the danger tier.
pub const DANGER_STREAK: u32 = 11;

/// Streak at or above which a security is in the warning tier.
pub const WARNING_STREAK: u32 = 8;

/// Number of presence flags kept for display.
pub const DISPLAY_FLAGS: usize = 30;

/// Operating time zone of the upstream exchange.
pub const MARKET_TZ: Tz = chrono_tz::America::New_York;
