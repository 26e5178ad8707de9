//! Shared fakes and fixtures for this crate's tests.
//!
//! The fakes follow the production contracts exactly: [`FakeLedger`]
//! acknowledges duplicates the way the real ledger's dedup does, and the
//! probe/link fakes are just flippable switches behind the same traits
//! the HTTP implementations sit behind.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use duka_core::types::{LineItem, TransactionRecord};
use duka_db::{Database, DbConfig};

use crate::config::SyncConfig;
use crate::connectivity::{LinkStatus, ReachabilityProbe};
use crate::ledger::{LedgerAck, LedgerError, LedgerSubmission, RemoteLedger};

// =============================================================================
// Fake Ledger
// =============================================================================

/// In-memory `RemoteLedger` with per-id failure injection.
pub(crate) struct FakeLedger {
    failing: Mutex<HashSet<String>>,
    submissions: Mutex<Vec<String>>,
}

impl FakeLedger {
    /// Accepts everything.
    pub(crate) fn accepting() -> Self {
        FakeLedger {
            failing: Mutex::new(HashSet::new()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Accepts everything except the given transaction id.
    pub(crate) fn failing_for(transaction_id: &str) -> Self {
        let ledger = Self::accepting();
        ledger.set_failing(transaction_id, true);
        ledger
    }

    /// Flips failure injection for one transaction id.
    pub(crate) fn set_failing(&self, transaction_id: &str, failing: bool) {
        let mut ids = self.failing.lock().unwrap();
        if failing {
            ids.insert(transaction_id.to_string());
        } else {
            ids.remove(transaction_id);
        }
    }

    /// Every transaction id submitted, in arrival order, rejections included.
    pub(crate) fn submissions(&self) -> Vec<String> {
        self.submissions.lock().unwrap().clone()
    }

    pub(crate) fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteLedger for FakeLedger {
    async fn submit(&self, submission: &LedgerSubmission) -> Result<LedgerAck, LedgerError> {
        let count = {
            let mut seen = self.submissions.lock().unwrap();
            seen.push(submission.transaction_id.clone());
            seen.len()
        };

        if self.failing.lock().unwrap().contains(&submission.transaction_id) {
            return Err(LedgerError::Rejected {
                status: 503,
                detail: "injected failure".to_string(),
            });
        }

        Ok(LedgerAck {
            status: "accepted".to_string(),
            reference: Some(format!("LGR-{count:04}")),
        })
    }
}

// =============================================================================
// Fake Connectivity
// =============================================================================

/// Flippable `LinkStatus` for driving the engine directly.
pub(crate) struct FakeLink {
    up: AtomicBool,
}

impl FakeLink {
    pub(crate) fn up() -> Self {
        FakeLink {
            up: AtomicBool::new(true),
        }
    }

    pub(crate) fn down() -> Self {
        FakeLink {
            up: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }
}

#[async_trait]
impl LinkStatus for FakeLink {
    async fn is_reachable(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }
}

/// Flippable `ReachabilityProbe` for driving the monitor.
pub(crate) struct FakeProbe {
    up: AtomicBool,
}

impl FakeProbe {
    pub(crate) fn up() -> Self {
        FakeProbe {
            up: AtomicBool::new(true),
        }
    }

    pub(crate) fn down() -> Self {
        FakeProbe {
            up: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReachabilityProbe for FakeProbe {
    async fn check(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Single-item record whose amounts pass validation: one unit priced at
/// the subtotal, no discount, total = subtotal + tax.
pub(crate) fn sample_record(subtotal_cents: i64, tax_cents: i64) -> TransactionRecord {
    let items = vec![LineItem::new(
        "p-chai",
        "CHAI",
        "Kenyan Chai",
        subtotal_cents,
        1,
    )];
    TransactionRecord::new(
        items,
        subtotal_cents,
        tax_cents,
        0,
        subtotal_cents + tax_cents,
    )
}

/// Fresh in-memory database with migrations applied.
pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database should open")
}

/// Valid config pointing at a ledger that is never actually contacted.
pub(crate) fn test_config() -> SyncConfig {
    let mut config = SyncConfig::default();
    config.device.id = "TILL-01".to_string();
    config.device.name = "Test Till".to_string();
    config.business.tin = "P051234567X".to_string();
    config.business.name = "Duka Test".to_string();
    config.ledger.url = "http://127.0.0.1:9".to_string();
    config.connectivity.probe_interval_secs = 1;
    config
}
