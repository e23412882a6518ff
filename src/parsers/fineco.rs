//! FinecoBank statement parser.
//!
//! Fineco splits the amount across inflow/outflow columns
//! (`entrate` / `uscite`) and ships a short operation label next to the full
//! description. Transfer labels are re-classified by the sign of the amount,
//! since the export uses one label for both directions.

use super::{BankParser, ParsedRow, ParsedStatement};
use crate::error::{Error, Result};
use crate::normalize::{normalize_date, normalize_optional_amount};
use crate::reader::RawTable;
use crate::transaction_types::{labels, resolve_type, FINECO_TYPE_MAP};
use crate::types::{CanonicalTransaction, ImportWarning, WarningKind};
use rust_decimal::Decimal;
use serde_json::json;

pub const BANK_ID: &str = "fineco";

pub struct FinecoParser;

impl FinecoParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FinecoParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for FinecoParser {
    fn bank_id(&self) -> &'static str {
        BANK_ID
    }

    fn skip_rows(&self) -> usize {
        12
    }

    fn can_parse(&self, table: &RawTable, _filename: Option<&str>) -> bool {
        table.has_columns(&["data_valuta"])
    }

    fn parse(&self, table: &RawTable) -> Result<ParsedStatement> {
        let columns = Columns::resolve(table)?;
        let mut parsed = ParsedStatement::default();

        for (index, _) in table.rows().iter().enumerate() {
            match parse_row(table, &columns, index) {
                Ok(row) => parsed.rows.push(row),
                Err(e) => {
                    log::warn!("Skipping row {}: {}", index, e);
                    parsed.warnings.push(
                        ImportWarning::new(WarningKind::ParsingError, e.to_string())
                            .with_details(json!({ "row": index })),
                    );
                }
            }
        }

        Ok(parsed)
    }
}

struct Columns {
    data_valuta: usize,
    entrate: usize,
    uscite: usize,
    descrizione: usize,
    descrizione_completa: usize,
}

impl Columns {
    fn resolve(table: &RawTable) -> Result<Self> {
        let required = |name: &str| {
            table.column(name).ok_or_else(|| Error::StructuralMismatch {
                bank: BANK_ID.to_string(),
                column: name.to_string(),
            })
        };
        Ok(Self {
            data_valuta: required("data_valuta")?,
            entrate: required("entrate")?,
            uscite: required("uscite")?,
            descrizione: required("descrizione")?,
            descrizione_completa: required("descrizione_completa")?,
        })
    }
}

fn parse_row(table: &RawTable, columns: &Columns, index: usize) -> Result<ParsedRow> {
    let date = normalize_date(table.cell(index, columns.data_valuta))?;

    let entrate =
        normalize_optional_amount(table.cell(index, columns.entrate))?.unwrap_or(Decimal::ZERO);
    let uscite =
        normalize_optional_amount(table.cell(index, columns.uscite))?.unwrap_or(Decimal::ZERO);
    let amount = entrate + uscite;

    let raw_label = table.cell(index, columns.descrizione).as_text();
    let transaction_type = extract_transaction_type(&raw_label, amount);

    // Description and details both carry the full text for now.
    let details = table.cell(index, columns.descrizione_completa).as_text();

    Ok(ParsedRow {
        transaction: CanonicalTransaction {
            bank: BANK_ID.to_string(),
            account: String::new(),
            date,
            amount,
            description: Some(details.clone()),
            details: Some(details),
            category: None,
            transaction_type: Some(transaction_type),
            is_special: false,
        },
        raw_index: index,
    })
}

/// Map the raw operation label onto the shared vocabulary.
///
/// Any label containing "bonifico" is first re-classified by the sign of the
/// normalized amount, since the export does not distinguish transfer
/// direction.
fn extract_transaction_type(raw_label: &str, amount: Decimal) -> String {
    let mut label = raw_label.trim().to_lowercase();

    if label.contains("bonifico") {
        label = if amount > Decimal::ZERO {
            "bonifico ricevuto".to_string()
        } else {
            "bonifico effettuato".to_string()
        };
    }

    let resolved = resolve_type(&label, FINECO_TYPE_MAP, labels::ALTRO);
    if resolved == labels::ALTRO && !label.is_empty() {
        log::warn!("Transaction type not found in mapping: {}", label);
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Cell;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn headers() -> Vec<String> {
        ["data_valuta", "entrate", "uscite", "descrizione", "descrizione_completa"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn row(data: &str, entrate: &str, uscite: &str, label: &str, full: &str) -> Vec<Cell> {
        let opt = |s: &str| {
            if s.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.into())
            }
        };
        vec![
            Cell::Text(data.into()),
            opt(entrate),
            opt(uscite),
            Cell::Text(label.into()),
            Cell::Text(full.into()),
        ]
    }

    #[test]
    fn test_transfer_reclassified_by_sign() {
        assert_eq!(
            extract_transaction_type("bonifico", Decimal::from_str("120.00").unwrap()),
            "Bonifico ricevuto"
        );
        assert_eq!(
            extract_transaction_type("bonifico", Decimal::from_str("-45.00").unwrap()),
            "Bonifico effettuato"
        );
        assert_eq!(
            extract_transaction_type("Bonifico SEPA Italia", Decimal::from_str("-45.00").unwrap()),
            "Bonifico effettuato"
        );
    }

    #[test]
    fn test_amount_sums_inflow_and_outflow() {
        let parser = FinecoParser::new();
        let table = RawTable::from_rows(
            headers(),
            vec![
                row(
                    "2024-05-02",
                    "",
                    "-37,90",
                    "Pagamento Visa Debit",
                    "Pag. Visa Debit del 01/05 FARMACIA ROMA",
                ),
                row(
                    "2024-05-03",
                    "120,00",
                    "",
                    "Bonifico",
                    "Bonifico a Vostro favore da ROSSI",
                ),
            ],
        );
        let parsed = parser.parse(&table).unwrap();
        assert_eq!(parsed.rows.len(), 2);

        let pos = &parsed.rows[0].transaction;
        assert_eq!(pos.amount, Decimal::from_str("-37.90").unwrap());
        assert_eq!(pos.transaction_type.as_deref(), Some("Pagamento con carta"));
        assert_eq!(
            pos.description.as_deref(),
            Some("Pag. Visa Debit del 01/05 FARMACIA ROMA")
        );

        let transfer = &parsed.rows[1].transaction;
        assert_eq!(transfer.amount, Decimal::from_str("120.00").unwrap());
        assert_eq!(
            transfer.transaction_type.as_deref(),
            Some("Bonifico ricevuto")
        );
    }

    #[test]
    fn test_unmapped_label_defaults() {
        assert_eq!(
            extract_transaction_type("Operazione esotica", Decimal::ZERO),
            "Altro"
        );
    }

    #[test]
    fn test_bad_date_row_is_skipped() {
        let parser = FinecoParser::new();
        let table = RawTable::from_rows(
            headers(),
            vec![row("??", "1,00", "", "Giroconto", "Giroconto interno")],
        );
        let parsed = parser.parse(&table).unwrap();
        assert!(parsed.rows.is_empty());
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].kind, WarningKind::ParsingError);
    }
}
