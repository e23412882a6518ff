//! Raw-record linkage.
//!
//! Persists the original bank-specific row next to the canonical record it
//! produced, for audit and debugging. Only two bank-specific shapes are
//! defined; uploads from any other bank skip linkage with a logged warning.
//! Linking happens strictly after the canonical batch is committed and never
//! rolls it back.

use crate::error::Result;
use crate::harmonize::HarmonizationOutcome;
use crate::ingest::StatementBatch;
use crate::normalize::{normalize_amount, normalize_date, normalize_optional_amount};
use crate::reader::RawTable;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Original Intesa export row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntesaRawRecord {
    pub data: NaiveDate,
    pub operazione: Option<String>,
    pub dettagli: Option<String>,
    pub conto_o_carta: Option<String>,
    pub contabilizzazione: Option<String>,
    pub categoria: Option<String>,
    pub valuta: Option<String>,
    pub importo: Decimal,
}

/// Original Allianz export row. The amount is the debit/credit column sum,
/// the same way the canonical record was derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllianzRawRecord {
    pub data_contabile: NaiveDate,
    pub data_valuta: Option<NaiveDate>,
    pub descrizione: Option<String>,
    pub importo: Decimal,
}

/// Bank-specific raw payload attached to a persisted transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "bank", rename_all = "snake_case")]
pub enum RawRecordPayload {
    Intesa(IntesaRawRecord),
    Allianz(AllianzRawRecord),
}

/// One raw row joined to the persisted record it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedRawRecord {
    pub transaction_id: i64,
    pub payload: RawRecordPayload,
}

/// Join committed records back to the raw rows they came from.
///
/// The join uses the explicit raw-row keys carried through parsing and
/// collapsing, so rows dropped by the parser or merged into one record can
/// never shift the alignment of the rest. A row that fails to build is
/// logged and skipped; the committed canonical records stay untouched.
pub fn link_raw_records(
    batch: &StatementBatch,
    outcome: &HarmonizationOutcome,
) -> Vec<LinkedRawRecord> {
    let builder: fn(&RawTable, usize) -> Result<RawRecordPayload> =
        match batch.bank.to_lowercase().trim() {
            "intesa" | "banca intesa" => build_intesa,
            "allianz" => build_allianz,
            other => {
                log::warn!(
                    "Unknown bank name: {}. Skipping raw transaction insertion.",
                    other
                );
                return Vec::new();
            }
        };

    let mut linked = Vec::new();
    for (stored, &batch_index) in outcome.committed.iter().zip(&outcome.new_indices) {
        let Some(raw_indices) = batch.raw_indices.get(batch_index) else {
            log::warn!(
                "No raw rows recorded for batch index {}; skipping",
                batch_index
            );
            continue;
        };
        for &raw_index in raw_indices {
            match builder(&batch.raw_table, raw_index) {
                Ok(payload) => linked.push(LinkedRawRecord {
                    transaction_id: stored.id,
                    payload,
                }),
                Err(e) => {
                    log::error!("Error linking raw row {}: {}", raw_index, e);
                }
            }
        }
    }
    linked
}

fn optional_text(table: &RawTable, row: usize, column: Option<usize>) -> Option<String> {
    let text = table.cell(row, column?).as_text();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn build_intesa(table: &RawTable, row: usize) -> Result<RawRecordPayload> {
    let cell = |name: &str| table.column(name).map(|c| table.cell(row, c));

    let data = normalize_date(cell("data").unwrap_or(&crate::reader::Cell::Empty))?;
    let importo = normalize_amount(cell("importo").unwrap_or(&crate::reader::Cell::Empty))?;

    Ok(RawRecordPayload::Intesa(IntesaRawRecord {
        data,
        operazione: optional_text(table, row, table.column("operazione")),
        dettagli: optional_text(table, row, table.column("dettagli")),
        conto_o_carta: optional_text(table, row, table.column("conto o carta")),
        contabilizzazione: optional_text(table, row, table.column("contabilizzazione")),
        categoria: optional_text(table, row, table.column("categoria")),
        valuta: optional_text(table, row, table.column("valuta")),
        importo,
    }))
}

fn build_allianz(table: &RawTable, row: usize) -> Result<RawRecordPayload> {
    let cell = |name: &str| table.column(name).map(|c| table.cell(row, c));

    let data_contabile =
        normalize_date(cell("data contabile").unwrap_or(&crate::reader::Cell::Empty))?;
    let data_valuta = cell("data valuta").and_then(|c| normalize_date(c).ok());

    let dare = cell("dare euro")
        .map(normalize_optional_amount)
        .transpose()?
        .flatten()
        .unwrap_or(Decimal::ZERO);
    let avere = cell("avere euro")
        .map(normalize_optional_amount)
        .transpose()?
        .flatten()
        .unwrap_or(Decimal::ZERO);

    Ok(RawRecordPayload::Allianz(AllianzRawRecord {
        data_contabile,
        data_valuta,
        descrizione: optional_text(table, row, table.column("descrizione")),
        importo: dare + avere,
    }))
}
