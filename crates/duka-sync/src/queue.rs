//! # Transaction Queue Facade
//!
//! The checkout-facing surface of the sync stack.
//!
//! ## The Enqueue Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      enqueue_and_sync(record)                           │
//! │                                                                         │
//! │  validate ──► append to local queue ──► nudge the worker ──► Ok(id)    │
//! │                      │                        │                         │
//! │                      │ fails?                 │ fails?                  │
//! │                      ▼                        ▼                         │
//! │                 Err(Storage)              log + Ok(id)                  │
//! │              (checkout must fail)      (sale is safe on disk)           │
//! │                                                                         │
//! │  Success means exactly one thing: the sale is durably persisted.        │
//! │  Whether the ledger hears about it now, in an hour, or tomorrow is      │
//! │  the worker's problem. A till in a basement with no signal accepts      │
//! │  sales at full speed.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::{debug, warn};

use duka_core::types::TransactionRecord;
use duka_core::validation::validate_record;
use duka_db::{Database, QueuedTransaction};

use crate::error::SyncResult;
use crate::worker::{SyncTrigger, SyncWorkerHandle};

/// Durable queue plus a line to the sync worker.
///
/// Clones share the pool and the worker handle, so one instance per
/// till process is plenty but more are harmless.
#[derive(Debug, Clone)]
pub struct TransactionQueue {
    db: Arc<Database>,
    worker: SyncWorkerHandle,
}

impl TransactionQueue {
    pub fn new(db: Arc<Database>, worker: SyncWorkerHandle) -> Self {
        TransactionQueue { db, worker }
    }

    /// Records a sale and asks for an immediate sync attempt.
    ///
    /// Returns the transaction's business id once it is safely on disk.
    /// The sync nudge is best-effort: if the worker is busy or already
    /// stopped, the record still sits in the queue for the next pass.
    pub async fn enqueue_and_sync(&self, record: TransactionRecord) -> SyncResult<String> {
        validate_record(&record)?;

        let storage_id = self.db.queue().append(&record).await?;
        debug!(
            transaction_id = %record.id,
            storage_id,
            total_cents = record.total_cents,
            "Transaction queued"
        );

        if let Err(e) = self.worker.request_sync(SyncTrigger::Checkout) {
            warn!(error = %e, "Could not nudge sync worker, record stays queued");
        }

        Ok(record.id)
    }

    /// Fires a manual sync trigger. Never blocks, never waits for the pass.
    pub fn request_sync(&self) -> SyncResult<()> {
        self.worker.request_sync(SyncTrigger::Manual)
    }

    /// Number of transactions still waiting for the ledger.
    pub async fn pending_count(&self) -> SyncResult<i64> {
        Ok(self.db.queue().count_pending().await?)
    }

    /// Looks up a transaction by business id, if it was ever queued.
    pub async fn find(&self, business_id: &str) -> SyncResult<Option<QueuedTransaction>> {
        Ok(self.db.queue().find_by_business_id(business_id).await?)
    }

    /// Most recently queued transactions, newest first. For receipts and
    /// queue inspection.
    pub async fn history(&self, limit: u32) -> SyncResult<Vec<QueuedTransaction>> {
        Ok(self.db.queue().list_recent(limit).await?)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SyncEngine;
    use crate::error::SyncError;
    use crate::testing::{sample_record, test_config, test_db, FakeLedger, FakeLink};
    use crate::worker::SyncWorker;
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn queue_with_worker(link_up: bool) -> (TransactionQueue, Arc<FakeLedger>) {
        let db = Arc::new(test_db().await);
        let ledger = Arc::new(FakeLedger::accepting());
        let link = Arc::new(if link_up { FakeLink::up() } else { FakeLink::down() });

        let mut config = test_config();
        config.sync.interval_secs = 0;
        let config = Arc::new(config);

        let engine = Arc::new(SyncEngine::new(
            db.clone(),
            ledger.clone(),
            link,
            config.clone(),
        ));
        let (_event_tx, event_rx) = mpsc::channel(8);
        let (worker, handle) = SyncWorker::new(engine, event_rx, &config);
        tokio::spawn(worker.run());

        (TransactionQueue::new(db, handle), ledger)
    }

    #[tokio::test]
    async fn test_enqueue_returns_business_id_and_persists() {
        let (queue, _ledger) = queue_with_worker(false).await;

        let record = sample_record(10_000, 1_600);
        let expected_id = record.id.clone();

        let id = queue.enqueue_and_sync(record).await.unwrap();
        assert_eq!(id, expected_id);

        assert_eq!(queue.pending_count().await.unwrap(), 1);
        let found = queue.find(&id).await.unwrap().unwrap();
        assert_eq!(found.record.id, id);
        assert!(found.is_pending());
    }

    #[tokio::test]
    async fn test_enqueue_rejects_invalid_record() {
        let (queue, _ledger) = queue_with_worker(false).await;

        let mut record = sample_record(10_000, 1_600);
        record.items.clear();

        let err = queue.enqueue_and_sync(record).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidRecord(_)));
        assert_eq!(queue.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_enqueue_online_syncs_promptly() {
        let (queue, ledger) = queue_with_worker(true).await;

        queue.enqueue_and_sync(sample_record(10_000, 1_600)).await.unwrap();

        for _ in 0..100 {
            if queue.pending_count().await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(queue.pending_count().await.unwrap(), 0);
        assert_eq!(ledger.submission_count(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_succeeds_while_offline() {
        let (queue, ledger) = queue_with_worker(false).await;

        for cents in [10_000i64, 2_500, 7_000] {
            queue
                .enqueue_and_sync(sample_record(cents, cents * 16 / 100))
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(queue.pending_count().await.unwrap(), 3);
        assert_eq!(ledger.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let (queue, _ledger) = queue_with_worker(false).await;

        let mut ids = Vec::new();
        for cents in [10_000i64, 2_500, 7_000] {
            let id = queue
                .enqueue_and_sync(sample_record(cents, cents * 16 / 100))
                .await
                .unwrap();
            ids.push(id);
        }

        let recent = queue.history(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].record.id, ids[2]);
        assert_eq!(recent[1].record.id, ids[1]);
    }

    #[tokio::test]
    async fn test_find_round_trips_items() {
        let (queue, _ledger) = queue_with_worker(false).await;

        let record = sample_record(10_000, 1_600);
        let items = record.items.clone();

        let id = queue.enqueue_and_sync(record).await.unwrap();
        let found = queue.find(&id).await.unwrap().unwrap();

        assert_eq!(found.record.items, items);
        assert!(queue.find("TXN-NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_enqueue_survives_stopped_worker() {
        let (queue, _ledger) = queue_with_worker(false).await;

        // Stop the worker out from under the facade
        queue.worker.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Enqueue still lands; only the nudge is lost
        let id = queue.enqueue_and_sync(sample_record(10_000, 1_600)).await.unwrap();
        assert_eq!(queue.pending_count().await.unwrap(), 1);
        assert!(queue.find(&id).await.unwrap().is_some());
    }
}
