//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Storage      │  │      Records            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Storage        │  │  InvalidRecord          │ │
//! │  │  MissingLedgerUrl│ │  (queue I/O)    │  │  (failed validation)    │ │
//! │  │  InvalidUrl     │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  NOTE: remote ledger failures are NOT here. A rejected or unreachable  │
//! │  submission is ordinary operation for an offline till; the engine      │
//! │  records it per-record (LedgerError) and the pass carries on.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
///
/// ## Design Principles
/// - Each variant includes enough context for debugging
/// - Errors are categorized for different handling strategies
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Ledger URL not configured (required for sync).
    #[error("Ledger URL not configured. Set [ledger] url in sync.toml or DUKA_LEDGER_URL.")]
    MissingLedgerUrl,

    /// Invalid ledger URL.
    #[error("Invalid ledger URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// The local queue failed. Unlike a remote failure this aborts the
    /// current pass: without trustworthy local state the engine cannot
    /// tell what is already settled.
    #[error("Queue storage error: {0}")]
    Storage(String),

    // =========================================================================
    // Record Errors
    // =========================================================================
    /// A record failed validation before it reached the queue.
    #[error("Invalid transaction record: {0}")]
    InvalidRecord(String),

    // =========================================================================
    // Channel Errors
    // =========================================================================
    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<duka_db::DbError> for SyncError {
    fn from(err: duka_db::DbError) -> Self {
        SyncError::Storage(err.to_string())
    }
}

impl From<duka_core::CoreError> for SyncError {
    fn from(err: duka_core::CoreError) -> Self {
        SyncError::InvalidRecord(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if this error indicates a configuration problem.
    ///
    /// Config errors need operator intervention; retrying without a
    /// config change will fail the same way.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::MissingLedgerUrl
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if this error came from the local queue.
    ///
    /// Storage errors abort the current pass but the records involved
    /// stay pending, so a later pass picks them up again.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, SyncError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_categorization() {
        assert!(SyncError::MissingLedgerUrl.is_config_error());
        assert!(SyncError::InvalidUrl("not a url".into()).is_config_error());
        assert!(!SyncError::Storage("disk full".into()).is_config_error());
    }

    #[test]
    fn test_storage_error_categorization() {
        assert!(SyncError::Storage("disk full".into()).is_storage_error());
        assert!(!SyncError::ChannelError("closed".into()).is_storage_error());
    }

    #[test]
    fn test_db_error_conversion() {
        let db_err = duka_db::DbError::PoolExhausted;
        let sync_err = SyncError::from(db_err);
        assert!(sync_err.is_storage_error());
    }
}
