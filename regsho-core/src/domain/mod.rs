//! Domain types for the threshold list.

pub mod date_key;
pub mod history;
pub mod security;

pub use date_key::{DateKey, DateKeyError};
pub use history::{History, Snapshot};
pub use security::{market_label, RuleFlag, SecurityInfo, Symbol};
