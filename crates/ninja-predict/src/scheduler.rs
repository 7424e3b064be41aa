//! Periodic refresh of every (symbol, provider) pair
//!
//! The scheduler ticks at a fixed interval, fires the first cycle
//! immediately, and refuses to start a cycle while the previous one is
//! still running. Calls inside a cycle fan out with a concurrency cap and
//! every result, success or error, is written to the cache as it arrives.

use crate::cache::PredictionCache;
use crate::client::PredictionClient;
use crate::config::PredictConfig;
use crate::record::{PredictionRequest, Provider};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Whether a cycle is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Summary of one finished cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Result of asking for a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// A previous cycle was still running
    Skipped,
}

/// Point-in-time view of the scheduler for status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub refresh_interval_secs: u64,
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub last_cycle: Option<CycleReport>,
}

struct Inner {
    config: Arc<PredictConfig>,
    clients: Vec<Arc<dyn PredictionClient>>,
    cache: PredictionCache,
    running: AtomicBool,
    cycles_completed: AtomicU64,
    cycles_skipped: AtomicU64,
    last_cycle: RwLock<Option<CycleReport>>,
}

/// Clears the running flag when a cycle ends, including on panic.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives provider clients and fills the cache
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(
        config: Arc<PredictConfig>,
        clients: Vec<Arc<dyn PredictionClient>>,
        cache: PredictionCache,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                clients,
                cache,
                running: AtomicBool::new(false),
                cycles_completed: AtomicU64::new(0),
                cycles_skipped: AtomicU64::new(0),
                last_cycle: RwLock::new(None),
            }),
        }
    }

    /// Providers this scheduler refreshes, in client order
    pub fn providers(&self) -> Vec<Provider> {
        self.inner.clients.iter().map(|c| c.provider()).collect()
    }

    pub fn cache(&self) -> &PredictionCache {
        &self.inner.cache
    }

    /// Run one refresh cycle unless one is already in progress.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let inner = &self.inner;
        if inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            inner.cycles_skipped.fetch_add(1, Ordering::Relaxed);
            warn!("Previous refresh cycle still running, skipping tick");
            return CycleOutcome::Skipped;
        }
        let _running = RunningGuard(&inner.running);

        let started_at = Utc::now();
        let target_date = inner.config.target_date_for(started_at.date_naive());

        let mut calls = Vec::with_capacity(inner.config.symbols.len() * inner.clients.len());
        for symbol in &inner.config.symbols {
            for client in &inner.clients {
                let request = PredictionRequest::new(symbol.clone(), client.provider(), target_date);
                let client = Arc::clone(client);
                calls.push(async move { client.predict(request).await });
            }
        }
        let attempted = calls.len();

        info!(
            pairs = attempted,
            target_date = %target_date,
            "Starting refresh cycle"
        );

        let mut results =
            stream::iter(calls).buffer_unordered(inner.config.max_concurrent_calls.max(1));

        let mut succeeded = 0;
        let mut failed = 0;
        while let Some(record) = results.next().await {
            if record.is_ok() {
                succeeded += 1;
            } else {
                failed += 1;
            }
            debug!(
                symbol = %record.symbol,
                provider = %record.provider,
                status = ?record.status,
                elapsed_ms = record.elapsed_ms,
                "Caching prediction"
            );
            inner.cache.put(record).await;
        }

        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            attempted,
            succeeded,
            failed,
        };
        info!(
            attempted,
            succeeded,
            failed,
            duration_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "Refresh cycle finished"
        );

        *inner.last_cycle.write().await = Some(report.clone());
        inner.cycles_completed.fetch_add(1, Ordering::Relaxed);
        CycleOutcome::Completed(report)
    }

    /// Start the periodic trigger as a background task.
    ///
    /// The first cycle starts immediately. Cancelling `shutdown` stops new
    /// cycles; a cycle already in flight runs to completion on its own task.
    pub fn spawn(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let scheduler = self.clone();
        let period = self.inner.config.refresh_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_secs = period.as_secs(), "Refresh scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let cycle = scheduler.clone();
                        tokio::spawn(async move {
                            cycle.run_cycle().await;
                        });
                    }
                    () = shutdown.cancelled() => {
                        info!("Refresh scheduler stopping");
                        break;
                    }
                }
            }
        })
    }

    pub async fn status(&self) -> SchedulerStatus {
        let inner = &self.inner;
        SchedulerStatus {
            state: if inner.running.load(Ordering::Acquire) {
                SchedulerState::Running
            } else {
                SchedulerState::Idle
            },
            refresh_interval_secs: inner.config.refresh_interval.as_secs(),
            cycles_completed: inner.cycles_completed.load(Ordering::Relaxed),
            cycles_skipped: inner.cycles_skipped.load(Ordering::Relaxed),
            last_cycle: inner.last_cycle.read().await.clone(),
        }
    }
}
