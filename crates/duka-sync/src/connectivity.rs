//! # Connectivity Monitor
//!
//! Watches ledger reachability and emits edge-triggered restore events.
//!
//! ## Link State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Connectivity Monitor                               │
//! │                                                                         │
//! │  ┌─────────────┐   probe ok    ┌─────────────┐                         │
//! │  │ Unreachable │ ────────────► │  Reachable  │                         │
//! │  │  (initial)  │ ◄──────────── │             │                         │
//! │  └─────────────┘   probe fail  └─────────────┘                         │
//! │                                                                         │
//! │  EVENT RULE (edge-triggered):                                          │
//! │  ─────────────────────────────                                         │
//! │  A ReachabilityEvent is sent ONLY on the Unreachable → Reachable       │
//! │  transition. Ten consecutive successful probes produce ten state       │
//! │  reads of Reachable but zero additional events. The consumer never     │
//! │  sees an event storm from a stable link.                               │
//! │                                                                         │
//! │  Probe timeline (probe_interval = 5s):                                 │
//! │                                                                         │
//! │  t=0s    t=5s    t=10s   t=15s   t=20s   t=25s                         │
//! │   ✗       ✗       ✓       ✓       ✗       ✓                            │
//! │                   │                       │                            │
//! │                   ▼                       ▼                            │
//! │                 event                   event                          │
//! │                                                                         │
//! │  The initial state is Unreachable on purpose: a till that starts       │
//! │  online observes one restore event right away and drains whatever      │
//! │  queued up while it was powered off.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Link State
// =============================================================================

/// Reachability of the remote ledger as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// The ledger did not answer the last probe (or was never probed).
    Unreachable,
    /// The ledger answered the last probe.
    Reachable,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkState::Unreachable => write!(f, "unreachable"),
            LinkState::Reachable => write!(f, "reachable"),
        }
    }
}

/// Emitted once per Unreachable → Reachable transition.
#[derive(Debug, Clone)]
pub struct ReachabilityEvent {
    /// When the transition was observed.
    pub observed_at: DateTime<Utc>,
}

// =============================================================================
// Trait Seams
// =============================================================================

/// A single reachability check.
///
/// The production probe is an HTTP health check against the ledger, but
/// nothing in the monitor assumes that; tests plug in a flag.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Returns true when the remote ledger currently answers.
    async fn check(&self) -> bool;
}

/// Read access to the current link state.
///
/// The sync engine consults this at the start of every pass; it never
/// probes on its own.
#[async_trait]
pub trait LinkStatus: Send + Sync {
    /// Returns true when the last observation was Reachable.
    async fn is_reachable(&self) -> bool;
}

// =============================================================================
// HTTP Probe
// =============================================================================

/// Probes `GET {ledger_url}/health`.
///
/// Any 2xx answer counts as reachable. Timeouts, transport errors, and
/// error statuses all count as unreachable; the monitor does not care
/// why the ledger is away.
pub struct HttpProbe {
    client: reqwest::Client,
    health_url: String,
}

impl HttpProbe {
    /// Builds a probe from the ledger settings.
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let base = config.ledger.url.trim_end_matches('/');
        let health_url = format!("{}/health", base);

        let client = reqwest::Client::builder()
            .timeout(config.probe_timeout())
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("Failed to build probe client: {e}")))?;

        Ok(HttpProbe { client, health_url })
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn check(&self) -> bool {
        match self.client.get(&self.health_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                false
            }
        }
    }
}

// =============================================================================
// Monitor Handle
// =============================================================================

/// Handle for reading link state and stopping the monitor.
#[derive(Debug, Clone)]
pub struct ConnectivityHandle {
    /// Last observed link state.
    state: Arc<RwLock<LinkState>>,

    /// Shutdown signal.
    shutdown_tx: mpsc::Sender<()>,
}

impl ConnectivityHandle {
    /// Returns the last observed link state.
    pub async fn state(&self) -> LinkState {
        *self.state.read().await
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelError("Monitor already stopped".into()))
    }
}

#[async_trait]
impl LinkStatus for ConnectivityHandle {
    async fn is_reachable(&self) -> bool {
        *self.state.read().await == LinkState::Reachable
    }
}

// =============================================================================
// Connectivity Monitor
// =============================================================================

/// Background task that polls the probe and tracks transitions.
///
/// ## Usage
/// ```rust,ignore
/// let probe = Arc::new(HttpProbe::new(&config)?);
/// let (handle, mut events) = ConnectivityMonitor::spawn(probe, config.probe_interval());
///
/// // Somewhere else: react to restores
/// while let Some(event) = events.recv().await {
///     println!("Link restored at {}", event.observed_at);
/// }
/// ```
pub struct ConnectivityMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    probe_interval: Duration,
    state: Arc<RwLock<LinkState>>,
    event_tx: mpsc::Sender<ReachabilityEvent>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl ConnectivityMonitor {
    /// Creates the monitor and spawns its background task.
    ///
    /// Returns a handle for state reads and a receiver carrying one event
    /// per restore transition. The first probe runs immediately.
    pub fn spawn(
        probe: Arc<dyn ReachabilityProbe>,
        probe_interval: Duration,
    ) -> (ConnectivityHandle, mpsc::Receiver<ReachabilityEvent>) {
        // Small buffer: events are edge-triggered and the consumer drains
        // the whole queue per event, so losing a duplicate is harmless.
        let (event_tx, event_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let state = Arc::new(RwLock::new(LinkState::Unreachable));

        let monitor = ConnectivityMonitor {
            probe,
            probe_interval,
            state: state.clone(),
            event_tx,
            shutdown_rx,
        };

        tokio::spawn(monitor.run());

        let handle = ConnectivityHandle { state, shutdown_tx };

        (handle, event_rx)
    }

    /// Main monitor loop.
    async fn run(mut self) {
        info!(interval = ?self.probe_interval, "Connectivity monitor starting");

        let mut interval = tokio::time::interval(self.probe_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.poll().await;
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Connectivity monitor shutting down");
                    break;
                }
            }
        }

        info!("Connectivity monitor stopped");
    }

    /// Runs one probe and handles the state transition.
    async fn poll(&self) {
        let next = if self.probe.check().await {
            LinkState::Reachable
        } else {
            LinkState::Unreachable
        };

        let previous = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut *state, next)
        };

        if previous == next {
            return;
        }

        info!(from = %previous, to = %next, "Link state changed");

        if next == LinkState::Reachable {
            let event = ReachabilityEvent {
                observed_at: Utc::now(),
            };

            // try_send: if the consumer is behind, it already has a restore
            // event queued and one drain covers both.
            if let Err(e) = self.event_tx.try_send(event) {
                match e {
                    mpsc::error::TrySendError::Full(_) => {
                        debug!("Restore event dropped, consumer busy");
                    }
                    mpsc::error::TrySendError::Closed(_) => {
                        warn!("Restore event channel closed");
                    }
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
