//! # Sync Engine
//!
//! Drains pending transactions to the remote ledger, one pass at a time.
//!
//! ## Pass Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           sync_once()                                   │
//! │                                                                         │
//! │  link down? ──► Ok(offline report), zero remote calls                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  list_pending (insertion order)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌── per record ───────────────────────────────────────────────┐       │
//! │  │  build payload ─► submit ─► ok?  ──► mark_synced            │       │
//! │  │                              │                              │       │
//! │  │                              └─no─► record_failure,         │       │
//! │  │                                     NEXT record             │       │
//! │  └──────────────────────────────────────────────────────────────┘      │
//! │                                                                         │
//! │  FAILURE BOUNDARIES                                                     │
//! │  ──────────────────                                                     │
//! │  Remote trouble (refused, timeout, 4xx/5xx, bad body) is a              │
//! │  per-record event: the record keeps its PENDING state plus              │
//! │  diagnostics, and the pass moves on. One poisoned transaction           │
//! │  cannot block the queue behind it.                                      │
//! │                                                                         │
//! │  Local storage trouble is different: if the queue itself cannot         │
//! │  be read, or a settled record cannot be marked, the pass aborts         │
//! │  with Err. Continuing would risk a resubmit storm.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use duka_db::{Database, QueuedTransaction};

use crate::config::SyncConfig;
use crate::connectivity::LinkStatus;
use crate::error::SyncResult;
use crate::ledger::{LedgerSubmission, RemoteLedger};

// =============================================================================
// Pass Report
// =============================================================================

/// What one sync pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// True when the pass skipped remote work because the link was down.
    pub offline: bool,
    /// Pending records the pass tried to submit.
    pub attempted: usize,
    /// Records the ledger accepted and the store marked synced.
    pub synced: usize,
    /// Records that stay pending after a failed submission.
    pub failed: usize,
}

impl SyncReport {
    /// Report for a pass skipped offline.
    pub fn offline() -> Self {
        SyncReport {
            offline: true,
            ..SyncReport::default()
        }
    }

    /// True when the pass attempted work and none of it landed.
    ///
    /// The worker uses this to tell "ledger is struggling, back off" apart
    /// from "partial progress, keep the normal cadence".
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.synced == 0
    }
}

// =============================================================================
// Engine
// =============================================================================

/// One-pass synchronizer from the local queue to the remote ledger.
///
/// Holds only `Arc`-shared state; `sync_once` takes `&self` and is safe to
/// call from several tasks at once. Overlapping passes can submit the same
/// record twice, which the ledger's dedup on `transaction_id` absorbs.
pub struct SyncEngine {
    db: Arc<Database>,
    ledger: Arc<dyn RemoteLedger>,
    link: Arc<dyn LinkStatus>,
    config: Arc<SyncConfig>,
}

impl SyncEngine {
    pub fn new(
        db: Arc<Database>,
        ledger: Arc<dyn RemoteLedger>,
        link: Arc<dyn LinkStatus>,
        config: Arc<SyncConfig>,
    ) -> Self {
        SyncEngine {
            db,
            ledger,
            link,
            config,
        }
    }

    /// Runs one sync pass over the pending queue.
    ///
    /// Offline is a normal outcome, not an error: the report says so and no
    /// remote call is made. Each pending record is attempted at most once.
    /// Errors from the local store abort the pass; see the module docs for
    /// the failure boundaries.
    pub async fn sync_once(&self) -> SyncResult<SyncReport> {
        if !self.link.is_reachable().await {
            debug!("Skipping sync pass, ledger unreachable");
            return Ok(SyncReport::offline());
        }

        let pending = self.db.queue().list_pending().await?;
        if pending.is_empty() {
            debug!("Sync pass found nothing pending");
            return Ok(SyncReport::default());
        }

        info!(pending = pending.len(), "Sync pass starting");

        let mut report = SyncReport {
            attempted: pending.len(),
            ..SyncReport::default()
        };

        for queued in &pending {
            match self.submit_record(queued).await {
                Ok(SubmitOutcome::Accepted) => {
                    report.synced += 1;
                }
                Ok(SubmitOutcome::Failed(detail)) => {
                    report.failed += 1;
                    warn!(
                        transaction_id = %queued.record.id,
                        attempts = queued.attempts + 1,
                        error = %detail,
                        "Submission failed, transaction stays pending"
                    );
                    if let Err(e) = self.db.queue().record_failure(queued.storage_id, &detail).await
                    {
                        // Bookkeeping only: the record is still pending and
                        // will be retried either way.
                        error!(
                            storage_id = queued.storage_id,
                            error = %e,
                            "Failed to record submission failure"
                        );
                    }
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            attempted = report.attempted,
            synced = report.synced,
            failed = report.failed,
            "Sync pass complete"
        );

        Ok(report)
    }

    /// Submits one queued transaction.
    ///
    /// `Ok(Failed)` covers everything remote (plus a payload that cannot be
    /// built); `Err` is reserved for the local store refusing `mark_synced`.
    async fn submit_record(&self, queued: &QueuedTransaction) -> SyncResult<SubmitOutcome> {
        let submission = match LedgerSubmission::from_record(&queued.record, &self.config) {
            Ok(s) => s,
            Err(e) => return Ok(SubmitOutcome::Failed(e.to_string())),
        };

        match self.ledger.submit(&submission).await {
            Ok(ack) => {
                self.db.queue().mark_synced(queued.storage_id).await?;
                debug!(
                    transaction_id = %queued.record.id,
                    reference = ?ack.reference,
                    "Transaction synced"
                );
                Ok(SubmitOutcome::Accepted)
            }
            Err(e) => Ok(SubmitOutcome::Failed(e.to_string())),
        }
    }
}

enum SubmitOutcome {
    Accepted,
    Failed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_record, test_config, test_db, FakeLedger, FakeLink};
    use duka_core::types::SyncState;

    async fn engine_with(
        ledger: Arc<FakeLedger>,
        link: Arc<FakeLink>,
    ) -> (SyncEngine, Arc<Database>) {
        let db = Arc::new(test_db().await);
        let config = Arc::new(test_config());
        let engine = SyncEngine::new(db.clone(), ledger, link.clone(), config);
        (engine, db)
    }

    #[tokio::test]
    async fn test_offline_pass_is_a_no_op() {
        let ledger = Arc::new(FakeLedger::accepting());
        let link = Arc::new(FakeLink::down());
        let (engine, db) = engine_with(ledger.clone(), link).await;

        db.queue().append(&sample_record(10_000, 1_600)).await.unwrap();
        db.queue().append(&sample_record(2_500, 400)).await.unwrap();

        let report = engine.sync_once().await.unwrap();

        assert!(report.offline);
        assert_eq!(report.attempted, 0);
        assert_eq!(ledger.submission_count(), 0);
        assert_eq!(db.queue().count_pending().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_drains_whole_queue_in_order() {
        let ledger = Arc::new(FakeLedger::accepting());
        let link = Arc::new(FakeLink::up());
        let (engine, db) = engine_with(ledger.clone(), link).await;

        let mut ids = Vec::new();
        for cents in [10_000i64, 2_500, 7_000] {
            let record = sample_record(cents, cents * 16 / 100);
            ids.push(record.id.clone());
            db.queue().append(&record).await.unwrap();
        }

        let report = engine.sync_once().await.unwrap();

        assert!(!report.offline);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.synced, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(db.queue().count_pending().await.unwrap(), 0);

        // Submitted in insertion order
        assert_eq!(ledger.submissions(), ids);
    }

    #[tokio::test]
    async fn test_empty_queue_reports_zeroes() {
        let ledger = Arc::new(FakeLedger::accepting());
        let link = Arc::new(FakeLink::up());
        let (engine, _db) = engine_with(ledger.clone(), link).await;

        let report = engine.sync_once().await.unwrap();

        assert_eq!(report, SyncReport::default());
        assert_eq!(ledger.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_record_does_not_block_the_rest() {
        let a = sample_record(10_000, 1_600);
        let b = sample_record(2_500, 400);
        let c = sample_record(7_000, 1_120);

        let ledger = Arc::new(FakeLedger::failing_for(&a.id));
        let link = Arc::new(FakeLink::up());
        let (engine, db) = engine_with(ledger.clone(), link).await;

        for record in [&a, &b, &c] {
            db.queue().append(record).await.unwrap();
        }

        let report = engine.sync_once().await.unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.synced, 2);
        assert_eq!(report.failed, 1);

        let stuck = db.queue().get_by_business_id(&a.id).await.unwrap();
        assert!(stuck.is_pending());
        assert_eq!(stuck.attempts, 1);
        assert!(stuck.last_error.as_deref().unwrap_or("").contains("injected"));
        assert!(stuck.attempted_at.is_some());

        for id in [&b.id, &c.id] {
            let row = db.queue().get_by_business_id(id).await.unwrap();
            assert_eq!(row.record.sync_state, SyncState::Synced);
            assert!(row.synced_at.is_some());
        }
    }

    #[tokio::test]
    async fn test_failed_record_succeeds_on_a_later_pass() {
        let record = sample_record(10_000, 1_600);
        let ledger = Arc::new(FakeLedger::failing_for(&record.id));
        let link = Arc::new(FakeLink::up());
        let (engine, db) = engine_with(ledger.clone(), link).await;

        db.queue().append(&record).await.unwrap();

        let first = engine.sync_once().await.unwrap();
        assert!(first.all_failed());
        assert_eq!(db.queue().count_pending().await.unwrap(), 1);

        // Ledger recovers
        ledger.set_failing(&record.id, false);

        let second = engine.sync_once().await.unwrap();
        assert_eq!(second.synced, 1);
        assert_eq!(db.queue().count_pending().await.unwrap(), 0);

        // Failure diagnostics from the first pass survive the settle
        let row = db.queue().get_by_business_id(&record.id).await.unwrap();
        assert_eq!(row.attempts, 1);
        assert!(row.last_error.is_some());
    }

    #[tokio::test]
    async fn test_each_record_attempted_once_per_pass() {
        let record = sample_record(10_000, 1_600);
        let ledger = Arc::new(FakeLedger::failing_for(&record.id));
        let link = Arc::new(FakeLink::up());
        let (engine, db) = engine_with(ledger.clone(), link).await;

        db.queue().append(&record).await.unwrap();

        engine.sync_once().await.unwrap();
        assert_eq!(ledger.submission_count(), 1);

        engine.sync_once().await.unwrap();
        assert_eq!(ledger.submission_count(), 2);

        let row = db.queue().get_by_business_id(&record.id).await.unwrap();
        assert_eq!(row.attempts, 2);
    }

    #[test]
    fn test_all_failed() {
        assert!(!SyncReport::default().all_failed());
        assert!(!SyncReport::offline().all_failed());

        let partial = SyncReport {
            offline: false,
            attempted: 3,
            synced: 1,
            failed: 2,
        };
        assert!(!partial.all_failed());

        let total = SyncReport {
            offline: false,
            attempted: 3,
            synced: 0,
            failed: 3,
        };
        assert!(total.all_failed());
    }
}
