//! Harmonization: reconcile a parsed batch against persisted history.
//!
//! One run per (bank, account): look up the latest recorded date, classify
//! each incoming record as new or already-persisted, optionally gate the
//! insert behind explicit confirmation, then commit every new record as one
//! unit of work. Inputs are never mutated, so re-running a batch against its
//! own committed output classifies everything as duplicate.

use crate::error::Result;
use crate::store::TransactionStore;
use crate::types::CanonicalTransaction;
use chrono::NaiveDate;
use serde::Serialize;

/// Result of one harmonization run.
#[derive(Debug, Clone, Serialize)]
pub struct HarmonizationOutcome {
    /// Records committed by this run.
    pub inserted: usize,

    /// Records skipped as already-persisted duplicates.
    pub skipped: usize,

    /// Latest date recorded for (bank, account) before this run.
    pub last_observed_date: Option<NaiveDate>,

    /// Whether insertion went ahead (false when the reviewer declined or
    /// there was nothing new to insert).
    pub confirmed: bool,

    /// Committed records with their store-assigned identifiers, parallel to
    /// `new_indices`.
    #[serde(skip)]
    pub committed: Vec<crate::types::StoredTransaction>,

    /// Positions of the committed records in the input batch; the raw-record
    /// linker joins through these.
    #[serde(skip)]
    pub new_indices: Vec<usize>,
}

/// Split of an incoming batch into new records and persisted duplicates,
/// by position in the input slice.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub new_indices: Vec<usize>,
    pub duplicate_indices: Vec<usize>,
}

/// Confirmation gate for batches containing duplicates.
///
/// Implementations present the duplicates and the prior max date to whoever
/// can approve; returning `false` aborts insertion for the whole batch.
pub trait DuplicateReview {
    fn confirm(
        &mut self,
        duplicates: &[&CanonicalTransaction],
        last_observed: Option<NaiveDate>,
    ) -> bool;
}

/// Reviewer that always approves; used when no gating is wanted.
pub struct AutoApprove;

impl DuplicateReview for AutoApprove {
    fn confirm(&mut self, _: &[&CanonicalTransaction], _: Option<NaiveDate>) -> bool {
        true
    }
}

/// Classify incoming records against the store.
///
/// A record matching an existing one exactly on (bank, account, date,
/// amount, description) is a duplicate. A lookup failure is logged and the
/// record is conservatively classified as new: an accidental duplicate can
/// be cleaned up later, silently dropped data cannot.
pub fn detect_duplicates(
    store: &dyn TransactionStore,
    transactions: &[CanonicalTransaction],
) -> Classification {
    let mut classification = Classification::default();

    for (index, transaction) in transactions.iter().enumerate() {
        let lookup = store.find_exact(
            &transaction.bank,
            &transaction.account,
            transaction.date,
            transaction.amount,
            transaction.description.as_deref(),
        );
        match lookup {
            Ok(Some(_)) => classification.duplicate_indices.push(index),
            Ok(None) => classification.new_indices.push(index),
            Err(e) => {
                log::error!(
                    "Error checking duplicate for transaction {} {:?}: {}",
                    transaction.date,
                    transaction.description,
                    e
                );
                classification.new_indices.push(index);
            }
        }
    }

    classification
}

/// Main entry point: detect duplicates and insert new records.
///
/// When `review` is supplied and duplicates were found, insertion waits for
/// an explicit approval; declining aborts the whole batch while the
/// duplicates are still reported in the outcome. A commit failure rolls the
/// batch back in the store and propagates unchanged.
pub fn harmonize_and_insert(
    store: &mut dyn TransactionStore,
    transactions: &[CanonicalTransaction],
    bank: &str,
    account: &str,
    review: Option<&mut dyn DuplicateReview>,
) -> Result<HarmonizationOutcome> {
    if transactions.is_empty() {
        log::info!("No transactions to harmonize");
        return Ok(HarmonizationOutcome {
            inserted: 0,
            skipped: 0,
            last_observed_date: None,
            confirmed: false,
            committed: Vec::new(),
            new_indices: Vec::new(),
        });
    }

    let last_observed_date = match store.max_date(bank, account) {
        Ok(date) => date,
        Err(e) => {
            log::error!(
                "Error getting last observation date for {}/{}: {}",
                bank,
                account,
                e
            );
            None
        }
    };
    match last_observed_date {
        Some(date) => log::info!("Last observation date for {}/{}: {}", bank, account, date),
        None => log::info!(
            "Last observation date for {}/{}: no previous transactions",
            bank,
            account
        ),
    }

    let classification = detect_duplicates(store, transactions);
    let duplicates: Vec<&CanonicalTransaction> = classification
        .duplicate_indices
        .iter()
        .map(|&i| &transactions[i])
        .collect();
    log::info!("Found {} duplicate transactions", duplicates.len());

    for duplicate in &duplicates {
        log::warn!(
            "Skipping duplicate transaction - Bank: {}, Account: {}, Date: {}, Amount: {}, Description: {:?}",
            duplicate.bank,
            duplicate.account,
            duplicate.date,
            duplicate.amount,
            duplicate.description
        );
    }

    if classification.new_indices.is_empty() {
        log::info!("No new transactions to insert (all are duplicates)");
        return Ok(HarmonizationOutcome {
            inserted: 0,
            skipped: duplicates.len(),
            last_observed_date,
            confirmed: false,
            committed: Vec::new(),
            new_indices: Vec::new(),
        });
    }

    let mut confirmed = true;
    if let Some(review) = review {
        if !duplicates.is_empty() {
            confirmed = review.confirm(&duplicates, last_observed_date);
            if confirmed {
                log::info!("Reviewer confirmed insertion");
            } else {
                log::info!("Reviewer declined insertion");
            }
        }
    }

    let mut committed = Vec::new();
    let mut new_indices = Vec::new();
    if confirmed {
        let new_records: Vec<CanonicalTransaction> = classification
            .new_indices
            .iter()
            .map(|&i| transactions[i].clone())
            .collect();
        committed = store.insert_all(&new_records)?;
        new_indices = classification.new_indices;
        log::info!("Successfully inserted {} transactions", committed.len());
    } else {
        log::info!("Skipping insertion (not confirmed)");
    }

    log::info!(
        "Harmonization complete - inserted: {}, skipped: {} duplicates",
        committed.len(),
        duplicates.len()
    );

    Ok(HarmonizationOutcome {
        inserted: committed.len(),
        skipped: duplicates.len(),
        last_observed_date,
        confirmed,
        committed,
        new_indices,
    })
}
