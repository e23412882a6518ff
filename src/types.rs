//! Common types shared by the parsers, the orchestrator and the harmonizer.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The bank-agnostic transaction record every bank parser produces.
///
/// `date` and `amount` are always present and valid; the sign of `amount`
/// encodes debit (negative) or credit (positive). All other descriptive
/// fields may be absent. Records are never mutated after the ingestion
/// orchestrator hands them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    /// Stable lowercase identifier of the issuing bank format.
    pub bank: String,

    /// Account the statement belongs to.
    pub account: String,

    /// Transaction date (no time component).
    pub date: NaiveDate,

    /// Signed amount; debit/credit is encoded in the sign.
    pub amount: Decimal,

    /// Human-readable description derived from the bank's free text.
    pub description: Option<String>,

    /// Raw or secondary text kept alongside the description.
    pub details: Option<String>,

    /// Category assigned by the bank, if any.
    pub category: Option<String>,

    /// One of the shared transaction-type labels.
    pub transaction_type: Option<String>,

    /// Manually-marked transactions (never set by parsers).
    pub is_special: bool,
}

impl CanonicalTransaction {
    /// Grouping key for intra-file duplicate collapsing and duplicate
    /// display: every canonical field except the amount.
    pub fn collapse_key(&self) -> CollapseKey<'_> {
        CollapseKey {
            bank: &self.bank,
            account: &self.account,
            date: self.date,
            description: self.description.as_deref(),
            details: self.details.as_deref(),
            category: self.category.as_deref(),
            transaction_type: self.transaction_type.as_deref(),
            is_special: self.is_special,
        }
    }
}

/// Borrowed view over every canonical field except the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollapseKey<'a> {
    pub bank: &'a str,
    pub account: &'a str,
    pub date: NaiveDate,
    pub description: Option<&'a str>,
    pub details: Option<&'a str>,
    pub category: Option<&'a str>,
    pub transaction_type: Option<&'a str>,
    pub is_special: bool,
}

/// A canonical transaction as persisted by the storage collaborator:
/// the record plus its generated identifier and audit timestamp.
///
/// Owned by the store; the pipeline only reads it back for duplicate
/// lookups and raw-record linkage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTransaction {
    /// Store-assigned identifier.
    pub id: i64,

    /// The canonical record as it was inserted.
    #[serde(flatten)]
    pub transaction: CanonicalTransaction,

    /// Insertion timestamp.
    pub created_at: DateTime<Utc>,
}

/// Classification of a warning raised during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A row was dropped by a bank-specific filter rule.
    FilteredRow,
    /// Rows collapsed or flagged as duplicates within one file.
    Duplicate,
    /// A row could not be normalized and was skipped.
    ParsingError,
}

/// Structured warning surfaced to the caller instead of silent data loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportWarning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ImportWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
