//! Rebuild pipeline: update history, analyze, publish the result.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use regsho_core::analysis::{analyze_at, symbol_history, Summary, SymbolHistory};
use regsho_core::data::{JsonHistoryStore, NasdaqProvider, SnapshotFetcher, SnapshotStore};
use regsho_core::updater::{HistoryUpdater, LogProgress, UpdateOutcome, UpdateProgress};
use regsho_core::{AnalysisResult, DateKey, UpdateSummary};

use crate::config::MonitorConfig;
use crate::result_store::{ResultStore, ResultStoreError};

/// What a rebuild produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// A new result was published.
    Updated {
        update: UpdateSummary,
        ref_date: DateKey,
        summary: Summary,
    },
    /// The history has no populated date; the previous result is untouched.
    NoData { update: UpdateSummary },
}

impl RebuildOutcome {
    pub fn update_summary(&self) -> &UpdateSummary {
        match self {
            Self::Updated { update, .. } | Self::NoData { update } => update,
        }
    }
}

/// Everything one rebuild needs: fetcher, history store, result store and
/// the market timezone that defines "today".
pub struct RebuildPipeline {
    fetcher: Arc<dyn SnapshotFetcher>,
    history: Arc<dyn SnapshotStore>,
    results: Arc<ResultStore>,
    request_delay: Duration,
    tz: Tz,
}

impl RebuildPipeline {
    pub fn new(
        fetcher: Arc<dyn SnapshotFetcher>,
        history: Arc<dyn SnapshotStore>,
        results: Arc<ResultStore>,
    ) -> Self {
        Self {
            fetcher,
            history,
            results,
            request_delay: regsho_core::updater::DEFAULT_REQUEST_DELAY,
            tz: chrono_tz::America::New_York,
        }
    }

    /// Nasdaq fetcher plus JSON stores under `config.data_dir`.
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        config.validate().context("invalid monitor config")?;

        let fetcher = NasdaqProvider::with_settings(
            &config.source_url_template,
            config.request_timeout(),
        )
        .context("failed to build HTTP client")?;

        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(JsonHistoryStore::new(&config.data_dir)),
            Arc::new(ResultStore::new(&config.data_dir)),
        )
        .with_request_delay(config.request_delay())
        .with_timezone(config.market_tz()?))
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    pub fn results(&self) -> &Arc<ResultStore> {
        &self.results
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Current calendar date in the market timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    /// Fetch missing days into the history store.
    pub fn update(&self, today: NaiveDate, progress: &dyn UpdateProgress) -> UpdateOutcome {
        HistoryUpdater::new(self.fetcher.as_ref(), self.history.as_ref())
            .with_request_delay(self.request_delay)
            .run(today, progress)
    }

    /// Analyze the stored history without touching the network.
    pub fn analyze_stored(&self) -> Option<AnalysisResult> {
        analyze_at(&self.history.load(), Utc::now())
    }

    /// Presence of `symbol` over the stored history.
    pub fn symbol_history(&self, symbol: &str) -> SymbolHistory {
        symbol_history(&self.history.load(), symbol)
    }

    /// Full rebuild as of now.
    pub fn rebuild(&self) -> Result<RebuildOutcome, ResultStoreError> {
        self.rebuild_at(self.today(), Utc::now())
    }

    /// Full rebuild with an explicit market date and timestamp.
    pub fn rebuild_at(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<RebuildOutcome, ResultStoreError> {
        let outcome = self.update(today, &LogProgress);

        let Some(result) = analyze_at(&outcome.history, now) else {
            warn!("no populated dates in history; keeping previous result");
            return Ok(RebuildOutcome::NoData {
                update: outcome.summary,
            });
        };

        self.results.save(&result)?;

        let s = &result.summary;
        info!(
            ref_date = %result.ref_date,
            total = s.total,
            danger = s.danger,
            warning = s.warning,
            safe = s.safe,
            new_today = s.new_today,
            removed_today = s.removed_today,
            "[+] rebuild complete"
        );

        Ok(RebuildOutcome::Updated {
            update: outcome.summary,
            ref_date: result.ref_date,
            summary: result.summary,
        })
    }
}
