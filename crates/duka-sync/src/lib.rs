//! # duka-sync
//!
//! Offline-first transaction synchronization for the duka POS.
//!
//! ## Life of a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   checkout ──► TransactionQueue::enqueue_and_sync                       │
//! │                       │                                                 │
//! │                       ▼                                                 │
//! │              SQLite queue (WAL, fsync'd)          ← the sale is SAFE    │
//! │                       │                             here, online or     │
//! │                       │                             not                 │
//! │        ┌──────────────┼──────────────┐                                  │
//! │        │              │              │                                  │
//! │   checkout nudge   link restored   timer                                │
//! │        └──────────────┼──────────────┘                                  │
//! │                       ▼                                                 │
//! │                  SyncWorker ──► SyncEngine::sync_once                   │
//! │                                      │                                  │
//! │                                      ▼                                  │
//! │                        POST /transactions (per record)                  │
//! │                                      │                                  │
//! │                          accepted?   │   rejected/unreachable?          │
//! │                              │       │       │                          │
//! │                        mark_synced   │   stays pending,                 │
//! │                                      │   retried next pass              │
//! │                                      ▼                                  │
//! │                              remote ledger                              │
//! │                        (dedups on transaction id)                       │
//! │                                                                         │
//! │  GUARANTEES                                                             │
//! │  ──────────                                                             │
//! │  • Durable: an accepted sale survives restart and power loss.          │
//! │  • At-least-once: every queued sale reaches the ledger eventually;     │
//! │    duplicates are possible and the ledger absorbs them.                 │
//! │  • No head-of-line blocking: one rejected sale never strands the       │
//! │    sales behind it.                                                     │
//! │  • Checkout never waits on the network.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`SyncAgent::start`] wires everything; [`TransactionQueue`] is the only
//! type checkout code needs.

pub mod agent;
pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod queue;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{SyncAgent, SyncStatus};
pub use config::SyncConfig;
pub use connectivity::{
    ConnectivityHandle, ConnectivityMonitor, HttpProbe, LinkState, LinkStatus, ReachabilityEvent,
    ReachabilityProbe,
};
pub use engine::{SyncEngine, SyncReport};
pub use error::{SyncError, SyncResult};
pub use ledger::{HttpLedger, LedgerAck, LedgerError, LedgerSubmission, RemoteLedger};
pub use queue::TransactionQueue;
pub use worker::{SyncTrigger, SyncWorker, SyncWorkerHandle, WorkerStats};
