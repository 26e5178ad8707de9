//! # Transaction Queue Repository
//!
//! The durable offline queue of sale transactions. Every sale lands here
//! first; the sync engine drains it to the remote ledger when the link
//! allows.
//!
//! ## Queue Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Transaction Queue Lifecycle                           │
//! │                                                                         │
//! │  CHECKOUT (always local, never waits for the network)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  append(record) ──► INSERT INTO transaction_queue (..., 'pending')     │
//! │       │             storage_id assigned by SQLite (insertion order)    │
//! │       ▼                                                                 │
//! │  COMMIT ← fsync'd before we return (synchronous = FULL)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 SYNC PASS (background worker)                   │   │
//! │  │                                                                 │   │
//! │  │  1. list_pending() ──► WHERE sync_state = 'pending'            │   │
//! │  │                        ORDER BY storage_id (oldest first)      │   │
//! │  │                                                                 │   │
//! │  │  2. For each record:                                           │   │
//! │  │     a. Submit to remote ledger                                 │   │
//! │  │     b. On success: mark_synced(storage_id)                     │   │
//! │  │     c. On failure: record_failure(storage_id, error)           │   │
//! │  │        ← record stays pending, next record still attempted     │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                       │
//! │  • A committed sale is never lost (survives crash and power loss)      │
//! │  • Records sync oldest-first, one stuck record blocks nothing          │
//! │  • pending → synced is the only transition; synced is terminal         │
//! │  • Nothing is ever deleted                                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why `business_id` Is Not UNIQUE
//! The business id is generated by the till and travels to the remote
//! ledger, which deduplicates on it. If a buggy caller reuses an id, the
//! queue still accepts the row: rejecting a sale at durability time would
//! trade a money record for a constraint error. The duplicate surfaces
//! downstream where the ledger acks both rows as the same transaction.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use duka_core::{LineItem, SyncState, TransactionRecord};

// =============================================================================
// Queue Entry
// =============================================================================

/// A transaction as stored in the queue, with sync bookkeeping.
///
/// Wraps the business-level [`TransactionRecord`] together with the
/// storage identity and delivery diagnostics that only exist once the
/// record has been appended.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedTransaction {
    /// Storage identity, assigned by SQLite on append.
    /// Monotonically increasing: ordering by it reproduces insertion order.
    pub storage_id: i64,

    /// The business-level transaction payload.
    pub record: TransactionRecord,

    /// Number of failed delivery attempts so far.
    pub attempts: i64,

    /// Message from the most recent failed attempt, if any.
    pub last_error: Option<String>,

    /// When delivery was last attempted (success or failure).
    pub attempted_at: Option<DateTime<Utc>>,

    /// When the remote ledger confirmed this record. Set exactly once.
    pub synced_at: Option<DateTime<Utc>>,
}

impl QueuedTransaction {
    /// Whether this entry still needs to be delivered.
    pub fn is_pending(&self) -> bool {
        self.record.sync_state.is_pending()
    }
}

/// Raw row shape of `transaction_queue`.
///
/// Kept private: callers see [`QueuedTransaction`], which has the items
/// JSON already decoded.
#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    storage_id: i64,
    business_id: String,
    items_json: String,
    subtotal_cents: i64,
    tax_cents: i64,
    discount_cents: i64,
    total_cents: i64,
    created_at: DateTime<Utc>,
    sync_state: SyncState,
    attempts: i64,
    last_error: Option<String>,
    attempted_at: Option<DateTime<Utc>>,
    synced_at: Option<DateTime<Utc>>,
}

impl QueueRow {
    /// Decodes the row into the caller-facing shape.
    fn into_queued(self) -> DbResult<QueuedTransaction> {
        let items: Vec<LineItem> = serde_json::from_str(&self.items_json)?;

        Ok(QueuedTransaction {
            storage_id: self.storage_id,
            record: TransactionRecord {
                id: self.business_id,
                items,
                subtotal_cents: self.subtotal_cents,
                tax_cents: self.tax_cents,
                discount_cents: self.discount_cents,
                total_cents: self.total_cents,
                created_at: self.created_at,
                sync_state: self.sync_state,
            },
            attempts: self.attempts,
            last_error: self.last_error,
            attempted_at: self.attempted_at,
            synced_at: self.synced_at,
        })
    }
}

/// Column list shared by every SELECT in this repository.
const QUEUE_COLUMNS: &str = r#"
    storage_id, business_id, items_json,
    subtotal_cents, tax_cents, discount_cents, total_cents,
    created_at, sync_state, attempts, last_error, attempted_at, synced_at
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for the durable transaction queue.
#[derive(Debug, Clone)]
pub struct QueueRepository {
    pool: SqlitePool,
}

impl QueueRepository {
    /// Creates a new QueueRepository.
    pub fn new(pool: SqlitePool) -> Self {
        QueueRepository { pool }
    }

    /// Appends a transaction to the queue.
    ///
    /// The record is committed as `pending` before this returns: once the
    /// caller has the storage id, the sale survives process crash and
    /// power loss.
    ///
    /// ## Arguments
    /// * `record` - The transaction to persist. Its `sync_state` field is
    ///   ignored; new rows are always `pending`.
    ///
    /// ## Returns
    /// The storage id SQLite assigned to the row.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let record = TransactionRecord::new(items, subtotal, tax, discount, total);
    /// let storage_id = repo.append(&record).await?;
    /// ```
    pub async fn append(&self, record: &TransactionRecord) -> DbResult<i64> {
        let items_json = serde_json::to_string(&record.items)?;

        debug!(
            business_id = %record.id,
            total_cents = record.total_cents,
            "Appending transaction to queue"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO transaction_queue (
                business_id, items_json,
                subtotal_cents, tax_cents, discount_cents, total_cents,
                created_at, sync_state
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending')
            "#,
        )
        .bind(&record.id)
        .bind(&items_json)
        .bind(record.subtotal_cents)
        .bind(record.tax_cents)
        .bind(record.discount_cents)
        .bind(record.total_cents)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Lists all pending transactions, oldest first.
    ///
    /// ## Returns
    /// Records where `sync_state = 'pending'`, ordered by storage id
    /// (insertion order). The sync engine walks this list front to back.
    pub async fn list_pending(&self) -> DbResult<Vec<QueuedTransaction>> {
        let rows: Vec<QueueRow> = sqlx::query_as(&format!(
            r#"
            SELECT {QUEUE_COLUMNS}
            FROM transaction_queue
            WHERE sync_state = 'pending'
            ORDER BY storage_id ASC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QueueRow::into_queued).collect()
    }

    /// Marks a record as confirmed by the remote ledger.
    ///
    /// Idempotent: the `sync_state = 'pending'` guard means a second call
    /// for the same storage id matches zero rows and changes nothing, so
    /// a crash between remote confirmation and the local mark is safe to
    /// replay.
    ///
    /// ## Arguments
    /// * `storage_id` - The queue row to settle
    pub async fn mark_synced(&self, storage_id: i64) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE transaction_queue SET
                sync_state = 'synced',
                synced_at = ?2,
                attempted_at = ?2
            WHERE storage_id = ?1 AND sync_state = 'pending'
            "#,
        )
        .bind(storage_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!(storage_id, "mark_synced matched no pending row (already synced)");
        }

        Ok(())
    }

    /// Records a failed delivery attempt.
    ///
    /// Bumps the attempt counter and stores the error for diagnostics.
    /// The record stays `pending` and will be retried on the next pass.
    ///
    /// ## Arguments
    /// * `storage_id` - The queue row that failed to deliver
    /// * `error` - Message describing the failure
    pub async fn record_failure(&self, storage_id: i64, error: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE transaction_queue SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE storage_id = ?1
            "#,
        )
        .bind(storage_id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts pending transactions.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transaction_queue WHERE sync_state = 'pending'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Looks up a transaction by its business id.
    ///
    /// If a buggy caller reused an id, the earliest row wins; the
    /// duplicates are still visible through [`list_recent`].
    ///
    /// [`list_recent`]: QueueRepository::list_recent
    pub async fn find_by_business_id(
        &self,
        business_id: &str,
    ) -> DbResult<Option<QueuedTransaction>> {
        let row: Option<QueueRow> = sqlx::query_as(&format!(
            r#"
            SELECT {QUEUE_COLUMNS}
            FROM transaction_queue
            WHERE business_id = ?1
            ORDER BY storage_id ASC
            LIMIT 1
            "#
        ))
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QueueRow::into_queued).transpose()
    }

    /// Looks up a transaction by business id, erroring when absent.
    pub async fn get_by_business_id(&self, business_id: &str) -> DbResult<QueuedTransaction> {
        self.find_by_business_id(business_id)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "Transaction".to_string(),
                id: business_id.to_string(),
            })
    }

    /// Lists the most recent transactions regardless of sync state.
    ///
    /// ## Arguments
    /// * `limit` - Maximum rows to return, newest first
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<QueuedTransaction>> {
        let rows: Vec<QueueRow> = sqlx::query_as(&format!(
            r#"
            SELECT {QUEUE_COLUMNS}
            FROM transaction_queue
            ORDER BY storage_id DESC
            LIMIT ?1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QueueRow::into_queued).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
