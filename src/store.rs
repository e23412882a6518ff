//! Storage collaborator interface.
//!
//! The persistent engine itself lives outside this crate; the harmonizer
//! only needs the three operations below, each expected to run inside the
//! store's own transactional scope. [`MemoryStore`] is the reference
//! implementation used by the tests and the CLI tools.

use crate::error::Result;
use crate::types::{CanonicalTransaction, StoredTransaction};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

/// Read/insert interface the harmonizer reconciles against.
///
/// `insert_all` is one unit of work: either every record is committed and
/// returned with its generated identifier, or the batch is rolled back and
/// an error surfaces. Concurrent harmonization runs against the same
/// (bank, account) must be serialized by the store's isolation level or by
/// the caller; the duplicate-lookup-then-insert sequence is a
/// check-then-act race otherwise.
pub trait TransactionStore {
    /// Maximum transaction date persisted for (bank, account), if any.
    fn max_date(&self, bank: &str, account: &str) -> Result<Option<NaiveDate>>;

    /// Find a persisted record matching exactly on (bank, account, date,
    /// amount, description).
    fn find_exact(
        &self,
        bank: &str,
        account: &str,
        date: NaiveDate,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<Option<StoredTransaction>>;

    /// Insert a batch as one unit of work.
    fn insert_all(
        &mut self,
        transactions: &[CanonicalTransaction],
    ) -> Result<Vec<StoredTransaction>>;
}

/// In-memory store with sequential identifiers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<StoredTransaction>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously persisted records, continuing the
    /// identifier sequence after the highest one seen.
    pub fn from_records(records: Vec<StoredTransaction>) -> Self {
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0);
        Self { records, next_id }
    }

    pub fn records(&self) -> &[StoredTransaction] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TransactionStore for MemoryStore {
    fn max_date(&self, bank: &str, account: &str) -> Result<Option<NaiveDate>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.transaction.bank == bank && r.transaction.account == account)
            .map(|r| r.transaction.date)
            .max())
    }

    fn find_exact(
        &self,
        bank: &str,
        account: &str,
        date: NaiveDate,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<Option<StoredTransaction>> {
        Ok(self
            .records
            .iter()
            .find(|r| {
                r.transaction.bank == bank
                    && r.transaction.account == account
                    && r.transaction.date == date
                    && r.transaction.amount == amount
                    && r.transaction.description.as_deref() == description
            })
            .cloned())
    }

    fn insert_all(
        &mut self,
        transactions: &[CanonicalTransaction],
    ) -> Result<Vec<StoredTransaction>> {
        let now = Utc::now();
        let mut inserted = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            self.next_id += 1;
            let record = StoredTransaction {
                id: self.next_id,
                transaction: transaction.clone(),
                created_at: now,
            };
            self.records.push(record.clone());
            inserted.push(record);
        }
        Ok(inserted)
    }
}
