//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DUKA_LEDGER_URL=https://ledger.example.com/api                     │
//! │     DUKA_DEVICE_ID=abc-123                                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/duka-pos/sync.toml (Linux)                               │
//! │     ~/Library/Application Support/com.duka.pos/sync.toml (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     auto-generated device_id, 16% VAT market defaults                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Till 1"
//!
//! [business]
//! tin = "P051234567X"
//! name = "Mama Njeri's Kiosk"
//! currency = "KES"
//!
//! [ledger]
//! url = "https://ledger.example.com/api"
//! api_key = "secret-key"
//! request_timeout_secs = 10
//!
//! [connectivity]
//! probe_interval_secs = 5
//! probe_timeout_secs = 3
//!
//! [sync]
//! interval_secs = 30   # 0 disables the periodic timer pass
//! initial_backoff_ms = 500
//! max_backoff_secs = 60
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Device Configuration
// =============================================================================

/// Configuration for this till.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier (UUID v4).
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Human-readable device name (e.g., "Till 1", "Back Counter").
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "Duka Till".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Business Configuration
// =============================================================================

/// Identity of the business this till sells for.
///
/// Embedded in every ledger submission so the remote side can attribute
/// the transaction without a lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessConfig {
    /// Tax identification number. May be empty for unregistered kiosks;
    /// the ledger decides whether it requires one.
    #[serde(default)]
    pub tin: String,

    /// Trading name.
    #[serde(default = "default_business_name")]
    pub name: String,

    /// ISO 4217 currency code for all amounts.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_business_name() -> String {
    "Duka Store".to_string()
}

fn default_currency() -> String {
    duka_core::CURRENCY.to_string()
}

impl Default for BusinessConfig {
    fn default() -> Self {
        BusinessConfig {
            tin: String::new(),
            name: default_business_name(),
            currency: default_currency(),
        }
    }
}

// =============================================================================
// Ledger Settings
// =============================================================================

/// Remote ledger endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Base URL of the ledger API (e.g., "https://ledger.example.com/api").
    /// Empty means not configured; the agent refuses to start without it.
    #[serde(default)]
    pub url: String,

    /// Bearer token for the ledger API, if it requires one.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            url: String::new(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// =============================================================================
// Connectivity Settings
// =============================================================================

/// Reachability probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivitySettings {
    /// Interval between reachability probes (seconds).
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,

    /// Timeout for a single probe request (seconds).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_probe_interval() -> u64 {
    5
}

fn default_probe_timeout() -> u64 {
    3
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        ConnectivitySettings {
            probe_interval_secs: default_probe_interval(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Sync pass scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Interval between periodic timer passes (seconds).
    /// Set to 0 to disable the timer; checkout and link-restored triggers
    /// still run passes.
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,

    /// Initial cooldown (milliseconds) after a timer pass where every
    /// record failed.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum cooldown (seconds) between all-failing timer passes.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_sync_interval() -> u64 {
    30
}

fn default_initial_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    60
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            interval_secs: default_sync_interval(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
///
/// ## Example Config File
/// ```toml
/// [device]
/// id = "550e8400-e29b-41d4-a716-446655440000"
/// name = "Till 1"
///
/// [business]
/// tin = "P051234567X"
/// name = "Mama Njeri's Kiosk"
///
/// [ledger]
/// url = "https://ledger.example.com/api"
///
/// [sync]
/// interval_secs = 30
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Device-specific configuration.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Business identity.
    #[serde(default)]
    pub business: BusinessConfig,

    /// Remote ledger endpoint.
    #[serde(default)]
    pub ledger: LedgerSettings,

    /// Reachability probe settings.
    #[serde(default)]
    pub connectivity: ConnectivitySettings,

    /// Sync pass scheduling.
    #[serde(default)]
    pub sync: SyncSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults and a generated device ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        // Try to load from config file
        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        // Override with environment variables
        config.apply_env_overrides();

        // Validate the configuration
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        // Device ID must be present
        if self.device.id.is_empty() {
            return Err(SyncError::InvalidConfig(
                "device.id must not be empty".into(),
            ));
        }

        // If a ledger URL is set, it must be a well-formed http(s) URL.
        // Empty is allowed here: the agent checks for it at start so that
        // offline-only tooling (seeding, queue inspection) still works.
        if !self.ledger.url.is_empty() {
            let parsed = url::Url::parse(&self.ledger.url)?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(SyncError::InvalidUrl(format!(
                    "Ledger URL must use http or https, got: {}",
                    self.ledger.url
                )));
            }
        }

        // Probe cadence of zero would spin
        if self.connectivity.probe_interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "connectivity.probe_interval_secs must be at least 1".into(),
            ));
        }

        if self.ledger.request_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "ledger.request_timeout_secs must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // Device ID
        if let Ok(id) = std::env::var("DUKA_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = id;
        }

        // Device name
        if let Ok(name) = std::env::var("DUKA_DEVICE_NAME") {
            self.device.name = name;
        }

        // Business TIN
        if let Ok(tin) = std::env::var("DUKA_BUSINESS_TIN") {
            self.business.tin = tin;
        }

        // Business name
        if let Ok(name) = std::env::var("DUKA_BUSINESS_NAME") {
            self.business.name = name;
        }

        // Ledger URL
        if let Ok(url) = std::env::var("DUKA_LEDGER_URL") {
            debug!(url = %url, "Overriding ledger URL from environment");
            self.ledger.url = url;
        }

        // Ledger API key
        if let Ok(key) = std::env::var("DUKA_LEDGER_API_KEY") {
            debug!("Overriding ledger API key from environment");
            self.ledger.api_key = Some(key);
        }

        // Timer pass interval
        if let Ok(interval) = std::env::var("DUKA_SYNC_INTERVAL_SECS") {
            if let Ok(secs) = interval.parse::<u64>() {
                debug!(interval_secs = secs, "Overriding sync interval from environment");
                self.sync.interval_secs = secs;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "duka", "pos").map(|dirs| {
            let config_dir = dirs.config_dir();
            config_dir.join("sync.toml")
        })
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the device ID.
    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    /// Returns the ledger URL if configured.
    pub fn ledger_url(&self) -> Option<&str> {
        if self.ledger.url.is_empty() {
            None
        } else {
            Some(&self.ledger.url)
        }
    }

    /// Returns the timer pass interval, or `None` when disabled.
    pub fn sync_interval(&self) -> Option<Duration> {
        if self.sync.interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.sync.interval_secs))
        }
    }

    /// Returns the reachability probe interval.
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.connectivity.probe_interval_secs)
    }

    /// Returns the probe request timeout.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity.probe_timeout_secs)
    }

    /// Returns the ledger request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.ledger.request_timeout_secs)
    }

    /// Returns the initial all-failed cooldown.
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.sync.initial_backoff_ms)
    }

    /// Returns the maximum all-failed cooldown.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.sync.max_backoff_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert!(!config.device.id.is_empty()); // Auto-generated
        assert_eq!(config.business.currency, "KES");
        assert_eq!(config.sync.interval_secs, 30);
        assert!(config.ledger_url().is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();
        assert!(config.validate().is_ok());

        // Empty device ID should fail
        config.device.id = String::new();
        assert!(config.validate().is_err());
        config.device.id = "till-1".to_string();

        // Non-http(s) URL should fail
        config.ledger.url = "ftp://ledger.example.com".to_string();
        assert!(config.validate().is_err());

        // Garbage URL should fail
        config.ledger.url = "not a url at all".to_string();
        assert!(config.validate().is_err());

        // Valid https URL should pass
        config.ledger.url = "https://ledger.example.com/api".to_string();
        assert!(config.validate().is_ok());

        // Unset URL is fine at validation time
        config.ledger.url = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_probe_interval_rejected() {
        let mut config = SyncConfig::default();
        config.connectivity.probe_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sync_interval_zero_disables_timer() {
        let mut config = SyncConfig::default();
        assert!(config.sync_interval().is_some());

        config.sync.interval_secs = 0;
        assert!(config.sync_interval().is_none());
    }

    #[test]
    fn test_toml_serialization() {
        let config = SyncConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[device]"));
        assert!(toml_str.contains("[business]"));
        assert!(toml_str.contains("[ledger]"));
        assert!(toml_str.contains("[sync]"));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = SyncConfig::default();
        config.business.tin = "P051234567X".to_string();
        config.ledger.url = "https://ledger.example.com/api".to_string();
        config.sync.interval_secs = 0;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let back: SyncConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(back.business.tin, "P051234567X");
        assert_eq!(back.ledger.url, "https://ledger.example.com/api");
        assert_eq!(back.sync.interval_secs, 0);
    }

    #[test]
    fn test_partial_file_gets_defaults() {
        let toml_str = r#"
            [ledger]
            url = "https://ledger.example.com/api"
        "#;
        let config: SyncConfig = toml::from_str(toml_str).unwrap();

        assert!(!config.device.id.is_empty());
        assert_eq!(config.business.currency, "KES");
        assert_eq!(config.connectivity.probe_interval_secs, 5);
        assert_eq!(config.ledger.request_timeout_secs, 10);
    }
}
