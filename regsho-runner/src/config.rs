//! Monitor configuration, loaded from an optional TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) gives a
//! working monitor pointed at the public Nasdaq Trader endpoint.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use regsho_core::data::nasdaq::DEFAULT_URL_TEMPLATE;

/// Errors from loading or validating a [`MonitorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown timezone '{0}'")]
    InvalidTimezone(String),

    #[error("invalid schedule time '{0}' (expected HH:MM)")]
    InvalidScheduleTime(String),

    #[error("schedule must contain at least one time")]
    EmptySchedule,

    #[error("worker_threads must be at least 1")]
    ZeroWorkers,

    #[error("source_url_template must contain a {{date}} placeholder: '{0}'")]
    MissingDatePlaceholder(String),
}

/// Runtime settings for the monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Directory holding `history.json`, its sidecar and `cache.json`.
    pub data_dir: PathBuf,

    /// Upstream URL with a `{date}` placeholder (YYYYMMDD).
    pub source_url_template: String,

    pub request_timeout_secs: u64,

    /// Pause between consecutive upstream requests.
    pub request_delay_ms: u64,

    /// IANA zone used for the schedule and for "today".
    pub timezone: String,

    /// Local wall-clock rebuild times, `HH:MM`.
    pub schedule: Vec<String>,

    /// Size of the rebuild worker pool.
    pub worker_threads: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            source_url_template: DEFAULT_URL_TEMPLATE.to_string(),
            request_timeout_secs: 15,
            request_delay_ms: 250,
            timezone: "America/New_York".to_string(),
            schedule: vec!["22:30".to_string(), "07:00".to_string()],
            worker_threads: 2,
        }
    }
}

impl MonitorConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// The file at `path` if given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.market_tz()?;
        self.schedule_times()?;
        if self.worker_threads == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if !self.source_url_template.contains("{date}") {
            return Err(ConfigError::MissingDatePlaceholder(
                self.source_url_template.clone(),
            ));
        }
        Ok(())
    }

    pub fn market_tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }

    /// Parsed schedule, sorted and deduplicated.
    pub fn schedule_times(&self) -> Result<Vec<NaiveTime>, ConfigError> {
        if self.schedule.is_empty() {
            return Err(ConfigError::EmptySchedule);
        }
        let mut times = self
            .schedule
            .iter()
            .map(|s| {
                NaiveTime::parse_from_str(s.trim(), "%H:%M")
                    .map_err(|_| ConfigError::InvalidScheduleTime(s.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        times.sort();
        times.dedup();
        Ok(times)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}
