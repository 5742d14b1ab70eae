//! Rebuild service: private worker pool, startup logic and the daily schedule.
//!
//! Rebuilds run on a private `rayon::ThreadPool` (never the global pool).
//! `trigger()` only queues work, so callers are never blocked. A named
//! scheduler thread wakes at each configured wall-clock time in the market
//! timezone and triggers a rebuild. A panicking rebuild is logged by the
//! pool's panic handler and does not take the process down.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::rebuild::{RebuildOutcome, RebuildPipeline};

/// Longest single sleep of the scheduler thread; bounds shutdown latency.
const SLEEP_SLICE: Duration = Duration::from_millis(500);

/// How the service came up.
#[derive(Debug)]
pub enum StartupMode {
    /// No stored result existed; a rebuild ran before returning.
    Synchronous(RebuildOutcome),
    /// A stored result was already available; a refresh was queued.
    Background,
}

/// Cloneable handle that queues rebuilds on the worker pool.
#[derive(Clone)]
pub(crate) struct RebuildTrigger {
    pipeline: Arc<RebuildPipeline>,
    pool: Arc<rayon::ThreadPool>,
    in_flight: Arc<AtomicUsize>,
}

impl RebuildTrigger {
    /// Queue a rebuild and return immediately.
    pub fn fire(&self) {
        let pipeline = Arc::clone(&self.pipeline);
        let in_flight = InFlightGuard::enter(&self.in_flight);

        self.pool.spawn(move || {
            let _in_flight = in_flight;
            match pipeline.rebuild() {
                Ok(RebuildOutcome::Updated { ref_date, .. }) => {
                    debug!(%ref_date, "background rebuild finished")
                }
                Ok(RebuildOutcome::NoData { .. }) => debug!("background rebuild found no data"),
                Err(e) => warn!(error = %e, "background rebuild failed to publish result"),
            }
        });
    }

    /// Rebuilds queued or running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Counts one queued or running rebuild; released on drop, including
/// when the rebuild unwinds.
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Owns the worker pool and the scheduler thread.
pub struct RebuildService {
    trigger: RebuildTrigger,
    shutdown: Arc<AtomicBool>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

impl RebuildService {
    pub fn new(pipeline: Arc<RebuildPipeline>, worker_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads.max(1))
            .thread_name(|i| format!("regsho-rebuild-{i}"))
            .panic_handler(|payload| {
                error!(panic = panic_message(payload.as_ref()), "background rebuild panicked");
            })
            .build()
            .context("failed to build rebuild worker pool")?;

        Ok(Self {
            trigger: RebuildTrigger {
                pipeline,
                pool: Arc::new(pool),
                in_flight: Arc::new(AtomicUsize::new(0)),
            },
            shutdown: Arc::new(AtomicBool::new(false)),
            scheduler: Mutex::new(None),
        })
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        let pipeline = RebuildPipeline::from_config(config)?;
        Self::new(Arc::new(pipeline), config.worker_threads)
    }

    pub fn pipeline(&self) -> &Arc<RebuildPipeline> {
        &self.trigger.pipeline
    }

    /// Fire-and-forget rebuild.
    pub fn trigger(&self) {
        self.trigger.fire();
    }

    pub fn in_flight(&self) -> usize {
        self.trigger.in_flight()
    }

    /// Rebuild synchronously if nothing is stored yet, otherwise queue a
    /// background refresh and return at once.
    pub fn startup(&self) -> Result<StartupMode> {
        if self.pipeline().results().has_result() {
            info!("stored result found; refreshing in background");
            self.trigger();
            return Ok(StartupMode::Background);
        }

        info!("no stored result; running initial rebuild");
        let outcome = self
            .pipeline()
            .rebuild()
            .context("initial rebuild failed to publish result")?;
        Ok(StartupMode::Synchronous(outcome))
    }

    /// Start the scheduler thread. A second call is a no-op.
    pub fn start_schedule(&self, times: Vec<NaiveTime>, tz: Tz) -> Result<()> {
        let mut slot = self.scheduler.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Ok(());
        }

        let trigger = self.trigger.clone();
        let shutdown = Arc::clone(&self.shutdown);
        let handle = thread::Builder::new()
            .name("regsho-scheduler".into())
            .spawn(move || scheduler_loop(trigger, times, tz, shutdown))
            .context("failed to spawn scheduler thread")?;

        *slot = Some(handle);
        Ok(())
    }

    /// Block until no rebuild is queued or running, or `timeout` passes.
    /// Returns `true` when idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        true
    }

    /// Block the calling thread until [`shutdown`](Self::shutdown) is
    /// called from elsewhere. Scheduled and triggered rebuilds keep running.
    pub fn wait_for_shutdown(&self) {
        while !self.shutdown.load(Ordering::SeqCst) {
            thread::sleep(SLEEP_SLICE);
        }
    }

    /// Stop the scheduler thread. Queued rebuilds still run to completion.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let handle = self
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("scheduler thread panicked");
            }
        }
    }
}

impl Drop for RebuildService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn scheduler_loop(trigger: RebuildTrigger, times: Vec<NaiveTime>, tz: Tz, shutdown: Arc<AtomicBool>) {
    while !shutdown.load(Ordering::SeqCst) {
        let Some(next) = next_fire_after(Utc::now(), &times, tz) else {
            warn!("empty schedule; scheduler exiting");
            return;
        };
        info!(next = %next.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z"), "next scheduled rebuild");

        loop {
            if shutdown.load(Ordering::SeqCst) {
                return;
            }
            let now = Utc::now();
            if now >= next {
                break;
            }
            let remaining = (next - now).to_std().unwrap_or_default();
            thread::sleep(remaining.min(SLEEP_SLICE));
        }

        info!("scheduled rebuild triggered");
        trigger.fire();
    }
}

/// Earliest scheduled instant strictly after `now`.
///
/// `times` are wall-clock times in `tz`. A time that falls in a DST gap
/// fires one hour later; an ambiguous time fires at its first occurrence.
pub fn next_fire_after(now: DateTime<Utc>, times: &[NaiveTime], tz: Tz) -> Option<DateTime<Utc>> {
    let local_today = now.with_timezone(&tz).date_naive();

    (0..=2)
        .filter_map(|offset| local_today.checked_add_days(chrono::Days::new(offset)))
        .flat_map(|date| times.iter().map(move |t| date.and_time(*t)))
        .filter_map(|naive| {
            tz.from_local_datetime(&naive)
                .earliest()
                .or_else(|| tz.from_local_datetime(&(naive + chrono::Duration::hours(1))).earliest())
        })
        .map(|local| local.with_timezone(&Utc))
        .filter(|fire| *fire > now)
        .min()
}
