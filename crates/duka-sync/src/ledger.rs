//! # Remote Ledger Client
//!
//! Submits queued transactions to the fiscal ledger over HTTPS.
//!
//! ## Submission Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     POST {ledger_url}/transactions                      │
//! │                                                                         │
//! │  TransactionRecord ──► LedgerSubmission (JSON) ──► ledger               │
//! │                                                       │                 │
//! │              ┌────────────────────────────────────────┤                 │
//! │              ▼                                        ▼                 │
//! │        2xx + ack body                           anything else           │
//! │        {status, reference?}                                             │
//! │              │                                        │                 │
//! │              ▼                                        ▼                 │
//! │        Ok(LedgerAck)                           Err(LedgerError)         │
//! │                                                                         │
//! │  DUPLICATE HANDLING                                                     │
//! │  ──────────────────                                                     │
//! │  The ledger deduplicates on `transaction_id`. Resubmitting an           │
//! │  already-settled transaction returns a normal 2xx ack, so retrying      │
//! │  after a lost response is always safe. That contract is what lets       │
//! │  the sync engine deliver at-least-once without double-charging.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use duka_core::types::TransactionRecord;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

/// Longest error body fragment carried into logs and `last_error`.
const ERROR_DETAIL_MAX: usize = 180;

// =============================================================================
// Wire Types
// =============================================================================

/// Business identity attached to every submission.
#[derive(Debug, Clone, Serialize)]
pub struct BusinessInfo {
    /// Tax identification number.
    pub tin: String,
    /// Registered business name.
    pub name: String,
}

/// One sold item as the ledger wants it.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionItem {
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

/// Money totals for the whole transaction.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionSummary {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    /// ISO 4217 code, e.g. "KES".
    pub currency: String,
}

/// Complete submission payload.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSubmission {
    /// Client-generated business id; the ledger's dedup key.
    pub transaction_id: String,
    /// Till that recorded the sale.
    pub device_id: String,
    pub business: BusinessInfo,
    /// When the sale was recorded locally (not when it was submitted).
    pub recorded_at: DateTime<Utc>,
    pub items: Vec<SubmissionItem>,
    pub summary: SubmissionSummary,
}

impl LedgerSubmission {
    /// Builds the payload for one queued transaction.
    pub fn from_record(record: &TransactionRecord, config: &SyncConfig) -> SyncResult<Self> {
        if record.items.is_empty() {
            return Err(SyncError::InvalidRecord(format!(
                "Transaction {} has no items",
                record.id
            )));
        }

        let items = record
            .items
            .iter()
            .map(|item| SubmissionItem {
                description: item.name.clone(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                line_total_cents: item.line_total_cents,
            })
            .collect();

        Ok(LedgerSubmission {
            transaction_id: record.id.clone(),
            device_id: config.device.id.clone(),
            business: BusinessInfo {
                tin: config.business.tin.clone(),
                name: config.business.name.clone(),
            },
            recorded_at: record.created_at,
            items,
            summary: SubmissionSummary {
                subtotal_cents: record.subtotal_cents,
                tax_cents: record.tax_cents,
                discount_cents: record.discount_cents,
                total_cents: record.total_cents,
                currency: config.business.currency.clone(),
            },
        })
    }
}

/// Acknowledgement returned by the ledger on success.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerAck {
    /// Settlement status, e.g. "accepted".
    #[serde(default)]
    pub status: String,
    /// Ledger-side reference for the settled transaction, when issued.
    #[serde(default)]
    pub reference: Option<String>,
}

// =============================================================================
// Errors
// =============================================================================

/// Why one submission failed.
///
/// These are per-record failures: the sync engine records them against the
/// one transaction and moves on to the next. They never abort a pass.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Could not reach the ledger at all.
    #[error("Ledger unreachable: {0}")]
    Unreachable(String),

    /// The request timed out.
    #[error("Ledger request timed out")]
    Timeout,

    /// Transport-level failure after connecting.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The ledger answered with a non-2xx status.
    #[error("Ledger rejected submission ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// Got a 2xx but the body was not a parseable ack.
    #[error("Unexpected ledger response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LedgerError::Timeout
        } else if e.is_connect() {
            LedgerError::Unreachable(e.to_string())
        } else {
            LedgerError::Transport(e.to_string())
        }
    }
}

// =============================================================================
// Trait Seam
// =============================================================================

/// Submission endpoint for settled transactions.
///
/// Implementations must deduplicate on `transaction_id`: submitting the same
/// id twice settles the transaction once and acknowledges both calls. The
/// HTTP ledger guarantees this server-side; test fakes mimic it.
#[async_trait]
pub trait RemoteLedger: Send + Sync {
    /// Submits one transaction, returning the ledger's acknowledgement.
    async fn submit(&self, submission: &LedgerSubmission) -> Result<LedgerAck, LedgerError>;
}

// =============================================================================
// HTTP Client
// =============================================================================

/// `RemoteLedger` over HTTPS with bearer auth.
pub struct HttpLedger {
    client: reqwest::Client,
    submit_url: String,
    api_key: Option<String>,
}

impl HttpLedger {
    /// Builds the client from the ledger settings.
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let base = config.ledger.url.trim_end_matches('/');
        let submit_url = format!("{}/transactions", base);

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(HttpLedger {
            client,
            submit_url,
            api_key: config.ledger.api_key.clone(),
        })
    }
}

#[async_trait]
impl RemoteLedger for HttpLedger {
    async fn submit(&self, submission: &LedgerSubmission) -> Result<LedgerAck, LedgerError> {
        let mut request = self.client.post(&self.submit_url).json(submission);

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Rejected {
                status: status.as_u16(),
                detail: extract_detail(&body),
            });
        }

        let ack: LedgerAck = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        debug!(
            transaction_id = %submission.transaction_id,
            status = %ack.status,
            reference = ?ack.reference,
            "Ledger accepted transaction"
        );

        Ok(ack)
    }
}

/// Pulls a readable message out of an error body.
///
/// FastAPI-style ledgers wrap errors as `{"detail": "..."}`; unwrap that
/// when present, otherwise keep a truncated slice of the raw body.
fn extract_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
            return compact(detail);
        }
    }
    compact(body)
}

/// Collapses whitespace and truncates for logs.
fn compact(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.len() <= ERROR_DETAIL_MAX {
        flat
    } else {
        let mut end = ERROR_DETAIL_MAX;
        while !flat.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &flat[..end])
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_record, test_config};

    #[test]
    fn test_submission_carries_record_fields() {
        let config = test_config();
        let record = sample_record(10_000, 1_600);

        let submission = LedgerSubmission::from_record(&record, &config).unwrap();

        assert_eq!(submission.transaction_id, record.id);
        assert_eq!(submission.device_id, config.device.id);
        assert_eq!(submission.recorded_at, record.created_at);
        assert_eq!(submission.items.len(), record.items.len());
        assert_eq!(submission.summary.subtotal_cents, 10_000);
        assert_eq!(submission.summary.tax_cents, 1_600);
        assert_eq!(submission.summary.total_cents, 11_600);
        assert_eq!(submission.summary.currency, "KES");
    }

    #[test]
    fn test_submission_rejects_empty_items() {
        let config = test_config();
        let mut record = sample_record(10_000, 1_600);
        record.items.clear();

        let err = LedgerSubmission::from_record(&record, &config).unwrap_err();
        assert!(matches!(err, SyncError::InvalidRecord(_)));
    }

    #[test]
    fn test_submission_serializes_expected_shape() {
        let config = test_config();
        let record = sample_record(5_000, 800);

        let submission = LedgerSubmission::from_record(&record, &config).unwrap();
        let json = serde_json::to_value(&submission).unwrap();

        assert!(json.get("transaction_id").is_some());
        assert!(json.get("device_id").is_some());
        assert!(json["business"].get("tin").is_some());
        assert!(json["items"][0].get("description").is_some());
        assert!(json["items"][0].get("line_total_cents").is_some());
        assert!(json["summary"].get("currency").is_some());
    }

    #[test]
    fn test_ack_parses_with_and_without_reference() {
        let full: LedgerAck =
            serde_json::from_str(r#"{"status": "accepted", "reference": "LGR-001"}"#).unwrap();
        assert_eq!(full.status, "accepted");
        assert_eq!(full.reference.as_deref(), Some("LGR-001"));

        let bare: LedgerAck = serde_json::from_str(r#"{"status": "accepted"}"#).unwrap();
        assert!(bare.reference.is_none());

        // Some ledgers answer 2xx with an empty object
        let empty: LedgerAck = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.status, "");
    }

    #[test]
    fn test_extract_detail_unwraps_fastapi_shape() {
        assert_eq!(
            extract_detail(r#"{"detail": "Invalid TIN"}"#),
            "Invalid TIN"
        );
        assert_eq!(extract_detail("plain text error"), "plain text error");

        let long = "x".repeat(400);
        let detail = extract_detail(&long);
        assert!(detail.len() <= ERROR_DETAIL_MAX + 3);
        assert!(detail.ends_with("..."));
    }

    #[test]
    fn test_compact_collapses_whitespace() {
        assert_eq!(compact("a\n  b\t c"), "a b c");
    }
}
