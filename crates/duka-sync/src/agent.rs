//! # Sync Agent
//!
//! Wires the whole sync stack together and runs it.
//!
//! ## Component Graph
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            SyncAgent                                    │
//! │                                                                         │
//! │   ConnectivityMonitor ──events──► SyncWorker ──calls──► SyncEngine      │
//! │         │                            ▲                     │  │         │
//! │         │ link state                 │ triggers            │  │         │
//! │         └───────────────► LinkStatus─┘                     │  │         │
//! │                                      │                     │  │         │
//! │   TransactionQueue ──────────────────┘          HttpLedger ┘  └ SQLite  │
//! │   (checkout facade)                                                     │
//! │                                                                         │
//! │  start() builds the HTTP ledger client and health probe from config;   │
//! │  start_with() accepts any RemoteLedger + ReachabilityProbe pair, which │
//! │  is how the full stack runs against fakes.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use duka_db::Database;

use crate::config::SyncConfig;
use crate::connectivity::{
    ConnectivityHandle, ConnectivityMonitor, HttpProbe, LinkState, LinkStatus, ReachabilityProbe,
};
use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};
use crate::ledger::{HttpLedger, RemoteLedger};
use crate::queue::TransactionQueue;
use crate::worker::{SyncWorker, SyncWorkerHandle};

// =============================================================================
// Status
// =============================================================================

/// Point-in-time view of the sync stack, for status lines and dashboards.
#[derive(Debug, Clone)]
pub struct SyncStatus {
    /// Last observed ledger reachability.
    pub link: LinkState,
    /// Transactions still waiting for the ledger.
    pub pending: i64,
    /// When the last sync pass finished.
    pub last_pass_at: Option<DateTime<Utc>>,
    /// When the queue was last fully in sync.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Most recent failure, if the last passes were not clean.
    pub last_error: Option<String>,
}

// =============================================================================
// Agent
// =============================================================================

/// Owns the background tasks and hands out the checkout facade.
#[derive(Debug)]
pub struct SyncAgent {
    db: Arc<Database>,
    config: Arc<SyncConfig>,
    monitor: ConnectivityHandle,
    worker: SyncWorkerHandle,
    queue: TransactionQueue,
}

impl SyncAgent {
    /// Starts the agent against the real HTTP ledger.
    ///
    /// Must run inside the Tokio runtime; the monitor and worker are
    /// spawned immediately. Fails fast when the config is unusable or no
    /// ledger URL is set.
    pub fn start(config: SyncConfig, db: Arc<Database>) -> SyncResult<SyncAgent> {
        config.validate()?;
        if config.ledger_url().is_none() {
            return Err(SyncError::MissingLedgerUrl);
        }

        let ledger: Arc<dyn RemoteLedger> = Arc::new(HttpLedger::new(&config)?);
        let probe: Arc<dyn ReachabilityProbe> = Arc::new(HttpProbe::new(&config)?);

        Self::start_with(config, db, ledger, probe)
    }

    /// Starts the agent with caller-supplied ledger and probe.
    pub fn start_with(
        config: SyncConfig,
        db: Arc<Database>,
        ledger: Arc<dyn RemoteLedger>,
        probe: Arc<dyn ReachabilityProbe>,
    ) -> SyncResult<SyncAgent> {
        config.validate()?;
        let config = Arc::new(config);

        let (monitor, event_rx) = ConnectivityMonitor::spawn(probe, config.probe_interval());
        let link: Arc<dyn LinkStatus> = Arc::new(monitor.clone());

        let engine = Arc::new(SyncEngine::new(
            db.clone(),
            ledger,
            link,
            config.clone(),
        ));

        let (worker, worker_handle) = SyncWorker::new(engine, event_rx, &config);
        tokio::spawn(worker.run());

        let queue = TransactionQueue::new(db.clone(), worker_handle.clone());

        info!(
            device_id = %config.device.id,
            device_name = %config.device.name,
            "Sync agent started"
        );

        Ok(SyncAgent {
            db,
            config,
            monitor,
            worker: worker_handle,
            queue,
        })
    }

    /// The checkout-facing queue facade. Clone it freely.
    pub fn queue(&self) -> &TransactionQueue {
        &self.queue
    }

    /// Effective configuration the agent is running with.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Current link state, queue depth, and pass history.
    pub async fn status(&self) -> SyncResult<SyncStatus> {
        let stats = self.worker.stats().await;

        Ok(SyncStatus {
            link: self.monitor.state().await,
            pending: self.db.queue().count_pending().await?,
            last_pass_at: stats.last_pass_at,
            last_success_at: stats.last_success_at,
            last_error: stats.last_error,
        })
    }

    /// Stops the worker and the monitor. Safe to call more than once.
    pub async fn shutdown(&self) {
        info!("Sync agent shutting down");
        let _ = self.worker.shutdown().await;
        let _ = self.monitor.shutdown().await;
    }
}

// =============================================================================
// Tests
// =============================================================================
