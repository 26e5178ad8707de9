//! # Sync Worker
//!
//! Single consumer task that owns the sync cadence.
//!
//! ## Trigger Fan-In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   checkout ──────────┐                                                  │
//! │   manual retry ──────┼──► trigger channel ──┐                          │
//! │                      │                       │                          │
//! │   link restored ─────────► event channel ───┼──► SyncWorker            │
//! │                                              │    (one task,            │
//! │   periodic timer ────────────────────────────┘     one pass at          │
//! │                                                     a time)             │
//! │                                                                         │
//! │  BACKOFF RULES                                                          │
//! │  ─────────────                                                          │
//! │  Only TIMER passes honor the backoff cooldown, and only a pass in       │
//! │  which every submission failed starts one. External triggers            │
//! │  (checkout, manual, link restored) are fresh information: they          │
//! │  bypass the cooldown and reset the backoff to its initial step.         │
//! │  Offline passes are instant no-ops and touch neither.                   │
//! │                                                                         │
//! │  failed pass ──► wait 500ms ──► failed ──► 1s ──► 2s ──► ... ──► 60s   │
//! │       ▲                                                                 │
//! │       └─── any success or external trigger resets to 500ms             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info};

use crate::config::SyncConfig;
use crate::connectivity::ReachabilityEvent;
use crate::engine::{SyncEngine, SyncReport};
use crate::error::{SyncError, SyncResult};

/// Ticker period when the periodic timer is disabled. The arm is guarded
/// off in the select, so this only keeps the interval type alive.
const DISABLED_TICK: Duration = Duration::from_secs(3600);

// =============================================================================
// Triggers
// =============================================================================

/// Why a sync pass is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// A sale was just recorded.
    Checkout,
    /// Operator asked for a retry.
    Manual,
    /// The connectivity monitor saw the link come back.
    LinkRestored,
    /// Periodic safety-net timer.
    Timer,
}

impl std::fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncTrigger::Checkout => write!(f, "checkout"),
            SyncTrigger::Manual => write!(f, "manual"),
            SyncTrigger::LinkRestored => write!(f, "link_restored"),
            SyncTrigger::Timer => write!(f, "timer"),
        }
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Rolling counters the worker keeps for status reporting.
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    /// Completed sync passes, offline no-ops included.
    pub passes: u64,
    /// When the last pass finished.
    pub last_pass_at: Option<DateTime<Utc>>,
    /// When the queue was last fully in sync after a pass.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Most recent pass-level or submission-level failure.
    pub last_error: Option<String>,
}

// =============================================================================
// Handle
// =============================================================================

/// Cheap, cloneable handle to a running worker.
#[derive(Debug, Clone)]
pub struct SyncWorkerHandle {
    trigger_tx: mpsc::Sender<SyncTrigger>,
    shutdown_tx: mpsc::Sender<()>,
    stats: Arc<RwLock<WorkerStats>>,
}

impl SyncWorkerHandle {
    /// Asks the worker for a sync pass. Never blocks.
    ///
    /// A full trigger channel is success: whichever queued trigger runs
    /// first drains everything this one would have.
    pub fn request_sync(&self, trigger: SyncTrigger) -> SyncResult<()> {
        match self.trigger_tx.try_send(trigger) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(SyncError::ChannelError("Sync worker stopped".into()))
            }
        }
    }

    /// Snapshot of the worker's counters.
    pub async fn stats(&self) -> WorkerStats {
        self.stats.read().await.clone()
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelError("Sync worker already stopped".into()))
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Owns the only steady-state caller of [`SyncEngine::sync_once`].
///
/// Every trigger source converges here, so passes are serialized without
/// any locking in the engine itself.
pub struct SyncWorker {
    engine: Arc<SyncEngine>,
    event_rx: mpsc::Receiver<ReachabilityEvent>,
    trigger_rx: mpsc::Receiver<SyncTrigger>,
    shutdown_rx: mpsc::Receiver<()>,
    sync_interval: Option<Duration>,
    backoff: ExponentialBackoff,
    cooldown_until: Option<tokio::time::Instant>,
    max_backoff: Duration,
    stats: Arc<RwLock<WorkerStats>>,
}

impl SyncWorker {
    /// Builds the worker and its handle. Call [`SyncWorker::run`] on a task.
    pub fn new(
        engine: Arc<SyncEngine>,
        event_rx: mpsc::Receiver<ReachabilityEvent>,
        config: &SyncConfig,
    ) -> (SyncWorker, SyncWorkerHandle) {
        let (trigger_tx, trigger_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let stats = Arc::new(RwLock::new(WorkerStats::default()));

        let worker = SyncWorker {
            engine,
            event_rx,
            trigger_rx,
            shutdown_rx,
            sync_interval: config.sync_interval(),
            backoff: build_backoff(config),
            cooldown_until: None,
            max_backoff: config.max_backoff(),
            stats: stats.clone(),
        };

        let handle = SyncWorkerHandle {
            trigger_tx,
            shutdown_tx,
            stats,
        };

        (worker, handle)
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        info!(interval = ?self.sync_interval, "Sync worker starting");

        let timer_enabled = self.sync_interval.is_some();
        let mut ticker = tokio::time::interval(self.sync_interval.unwrap_or(DISABLED_TICK));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(trigger) = self.trigger_rx.recv() => {
                    self.run_pass(trigger).await;
                }

                Some(event) = self.event_rx.recv() => {
                    debug!(observed_at = %event.observed_at, "Link restored, draining queue");
                    self.run_pass(SyncTrigger::LinkRestored).await;
                }

                _ = ticker.tick(), if timer_enabled => {
                    self.run_pass(SyncTrigger::Timer).await;
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Sync worker shutting down");
                    break;
                }

                else => break,
            }
        }

        info!("Sync worker stopped");
    }

    /// Runs one pass, subject to the backoff rules in the module docs.
    async fn run_pass(&mut self, trigger: SyncTrigger) {
        if trigger == SyncTrigger::Timer {
            if let Some(until) = self.cooldown_until {
                if tokio::time::Instant::now() < until {
                    debug!("Timer pass skipped, backing off after failures");
                    return;
                }
            }
        } else {
            // External triggers carry fresh information
            self.backoff.reset();
            self.cooldown_until = None;
        }

        debug!(trigger = %trigger, "Running sync pass");
        let result = self.engine.sync_once().await;
        self.note_pass(&result).await;

        match result {
            Ok(report) if report.offline => {}
            Ok(report) if report.all_failed() => {
                let delay = self.backoff.next_backoff().unwrap_or(self.max_backoff);
                debug!(delay_ms = delay.as_millis() as u64, "All submissions failed, backing off");
                self.cooldown_until = Some(tokio::time::Instant::now() + delay);
            }
            Ok(_) => {
                self.backoff.reset();
                self.cooldown_until = None;
            }
            Err(e) => {
                error!(trigger = %trigger, error = %e, "Sync pass aborted");
            }
        }
    }

    /// Folds a pass outcome into the shared stats.
    async fn note_pass(&self, result: &SyncResult<SyncReport>) {
        let now = Utc::now();
        let mut stats = self.stats.write().await;
        stats.passes += 1;
        stats.last_pass_at = Some(now);

        match result {
            Ok(report) if report.offline => {}
            Ok(report) if report.failed == 0 => {
                stats.last_success_at = Some(now);
                stats.last_error = None;
            }
            Ok(report) => {
                stats.last_error = Some(format!(
                    "{} of {} submissions failed",
                    report.failed, report.attempted
                ));
            }
            Err(e) => {
                stats.last_error = Some(e.to_string());
            }
        }
    }
}

fn build_backoff(config: &SyncConfig) -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: config.initial_backoff(),
        max_interval: config.max_backoff(),
        multiplier: 2.0,
        max_elapsed_time: None,
        ..ExponentialBackoff::default()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_record, test_config, test_db, FakeLedger, FakeLink};
    use duka_db::Database;

    struct WorkerRig {
        handle: SyncWorkerHandle,
        event_tx: mpsc::Sender<ReachabilityEvent>,
        db: Arc<Database>,
        ledger: Arc<FakeLedger>,
        link: Arc<FakeLink>,
    }

    async fn spawn_worker(config: SyncConfig) -> WorkerRig {
        let db = Arc::new(test_db().await);
        let ledger = Arc::new(FakeLedger::accepting());
        let link = Arc::new(FakeLink::up());
        let config = Arc::new(config);

        let engine = Arc::new(SyncEngine::new(
            db.clone(),
            ledger.clone(),
            link.clone(),
            config.clone(),
        ));

        let (event_tx, event_rx) = mpsc::channel(8);
        let (worker, handle) = SyncWorker::new(engine, event_rx, &config);
        tokio::spawn(worker.run());

        WorkerRig {
            handle,
            event_tx,
            db,
            ledger,
            link,
        }
    }

    async fn wait_until_drained(db: &Database) {
        for _ in 0..100 {
            if db.queue().count_pending().await.unwrap() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("queue never drained");
    }

    fn timerless_config() -> SyncConfig {
        let mut config = test_config();
        config.sync.interval_secs = 0;
        config
    }

    #[test]
    fn test_trigger_display() {
        assert_eq!(SyncTrigger::Checkout.to_string(), "checkout");
        assert_eq!(SyncTrigger::Manual.to_string(), "manual");
        assert_eq!(SyncTrigger::LinkRestored.to_string(), "link_restored");
        assert_eq!(SyncTrigger::Timer.to_string(), "timer");
    }

    #[tokio::test]
    async fn test_checkout_trigger_drains_queue() {
        let rig = spawn_worker(timerless_config()).await;

        rig.db.queue().append(&sample_record(10_000, 1_600)).await.unwrap();
        rig.handle.request_sync(SyncTrigger::Checkout).unwrap();

        wait_until_drained(&rig.db).await;
        assert_eq!(rig.ledger.submission_count(), 1);

        let stats = rig.handle.stats().await;
        assert!(stats.passes >= 1);
        assert!(stats.last_pass_at.is_some());
        assert!(stats.last_success_at.is_some());
        assert!(stats.last_error.is_none());

        rig.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_link_event_drains_backlog() {
        let rig = spawn_worker(timerless_config()).await;
        rig.link.set_up(false);

        rig.db.queue().append(&sample_record(10_000, 1_600)).await.unwrap();
        rig.db.queue().append(&sample_record(2_500, 400)).await.unwrap();

        // A manual poke while offline is a no-op
        rig.handle.request_sync(SyncTrigger::Manual).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(rig.ledger.submission_count(), 0);
        assert_eq!(rig.db.queue().count_pending().await.unwrap(), 2);

        // Link comes back: the restore event drains everything
        rig.link.set_up(true);
        rig.event_tx
            .send(ReachabilityEvent { observed_at: Utc::now() })
            .await
            .unwrap();

        wait_until_drained(&rig.db).await;
        assert_eq!(rig.ledger.submission_count(), 2);

        rig.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_timer_runs_passes_unprompted() {
        let mut config = test_config();
        config.sync.interval_secs = 1;
        let rig = spawn_worker(config).await;

        // Interval ticks fire immediately, so the first timer pass happens
        // right after spawn; the record lands before the next tick.
        rig.db.queue().append(&sample_record(10_000, 1_600)).await.unwrap();

        wait_until_drained(&rig.db).await;
        assert_eq!(rig.ledger.submission_count(), 1);

        rig.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_passes_back_off_but_manual_bypasses() {
        let record = sample_record(10_000, 1_600);

        let mut config = test_config();
        config.sync.interval_secs = 1;
        config.sync.initial_backoff_ms = 60_000;

        let db = Arc::new(test_db().await);
        let ledger = Arc::new(FakeLedger::failing_for(&record.id));
        let link = Arc::new(FakeLink::up());
        let config = Arc::new(config);

        let engine = Arc::new(SyncEngine::new(
            db.clone(),
            ledger.clone(),
            link.clone(),
            config.clone(),
        ));
        let (_event_tx, event_rx) = mpsc::channel(8);
        let (worker, handle) = SyncWorker::new(engine, event_rx, &config);
        tokio::spawn(worker.run());

        db.queue().append(&record).await.unwrap();

        // First timer tick fires immediately and fails; the cooldown then
        // swallows the following ticks.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ledger.submission_count(), 1);

        let stats = handle.stats().await;
        assert!(stats.last_error.is_some());

        // Manual retry ignores the cooldown
        handle.request_sync(SyncTrigger::Manual).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ledger.submission_count(), 2);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_worker() {
        let rig = spawn_worker(timerless_config()).await;

        rig.handle.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Worker is gone; triggers now report the closed channel
        let err = rig.handle.request_sync(SyncTrigger::Manual);
        assert!(matches!(err, Err(SyncError::ChannelError(_))));
    }
}
