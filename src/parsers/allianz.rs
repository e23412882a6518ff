//! Allianz statement parser.
//!
//! Allianz splits the amount across separate debit/credit columns
//! (`dare euro` / `avere euro`) that are summed before normalization, and
//! packs operation kind, time and merchant into one dash-delimited
//! description field.

use super::{BankParser, ParsedRow, ParsedStatement};
use crate::error::{Error, Result};
use crate::normalize::{normalize_date, normalize_optional_amount};
use crate::reader::RawTable;
use crate::transaction_types::{labels, resolve_type, ALLIANZ_TYPE_MAP};
use crate::types::{CanonicalTransaction, ImportWarning, WarningKind};
use rust_decimal::Decimal;
use serde_json::json;

pub const BANK_ID: &str = "allianz";

pub struct AllianzParser;

impl AllianzParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AllianzParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for AllianzParser {
    fn bank_id(&self) -> &'static str {
        BANK_ID
    }

    fn skip_rows(&self) -> usize {
        3
    }

    fn skip_footer(&self) -> usize {
        4
    }

    fn can_parse(&self, table: &RawTable, _filename: Option<&str>) -> bool {
        table.has_columns(&["dare euro", "avere euro"])
    }

    fn parse(&self, table: &RawTable) -> Result<ParsedStatement> {
        let columns = Columns::resolve(table)?;
        let mut parsed = ParsedStatement::default();

        for (index, _) in table.rows().iter().enumerate() {
            let result = parse_row(table, &columns, index);
            match result {
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
    data_contabile: usize,
    descrizione: usize,
    dare: usize,
    avere: usize,
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
            data_contabile: required("data contabile")?,
            descrizione: required("descrizione")?,
            dare: required("dare euro")?,
            avere: required("avere euro")?,
        })
    }
}

fn parse_row(table: &RawTable, columns: &Columns, index: usize) -> Result<ParsedRow> {
    let date = normalize_date(table.cell(index, columns.data_contabile))?;

    // Absent debit/credit cells contribute zero.
    let dare = normalize_optional_amount(table.cell(index, columns.dare))?.unwrap_or(Decimal::ZERO);
    let avere =
        normalize_optional_amount(table.cell(index, columns.avere))?.unwrap_or(Decimal::ZERO);
    let amount = dare + avere;

    let details = table.cell(index, columns.descrizione).as_text();
    let description = extract_description(&details);
    let transaction_type = extract_transaction_type(&details);

    Ok(ParsedRow {
        transaction: CanonicalTransaction {
            bank: BANK_ID.to_string(),
            account: String::new(),
            date,
            amount,
            description: Some(description),
            details: Some(details),
            category: None,
            transaction_type: Some(transaction_type),
            is_special: false,
        },
        raw_index: index,
    })
}

/// Collapse runs of whitespace, the way the source joins its fixed-width
/// fragments.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop `RIF:`-prefixed reference-number tokens.
fn strip_reference_tokens(s: &str) -> String {
    s.split_whitespace()
        .filter(|word| !word.starts_with("RIF:"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derive a readable description from the composite description field.
///
/// The text before the first dash names the operation kind; the remaining
/// segments carry time, merchant and card noise that is trimmed per kind.
fn extract_description(details: &str) -> String {
    let segments: Vec<&str> = details.split('-').collect();
    let kind = segments[0].trim();

    match kind {
        "Pagam. POS" => {
            if segments.len() > 1 && segments[1].contains("ORE") {
                let time_info = format!(
                    "ORE {}",
                    segments[1].trim().split("ORE").nth(1).unwrap_or("").trim()
                );
                if segments.len() > 2 {
                    let merchant = segments[2].trim().split("CARTA").next().unwrap_or("").trim();
                    return format!("POS - {} - {}", merchant, time_info);
                }
            }
            format!("POS - {}", details)
        }
        "Addeb. diretto" => {
            if segments.len() > 1 {
                format!("Addeb. diretto - {}", segments[1].trim())
            } else {
                format!("Addeb. diretto - {}", details)
            }
        }
        "Bancomat" => {
            if segments.len() > 1 && segments[1].contains("ORE") {
                let info = format!(
                    "ORE {}",
                    segments[1].trim().split("ORE").nth(1).unwrap_or("").trim()
                );
                let info = info.split("CARTA").next().unwrap_or("").trim().to_string();
                format!("Prelievo contanti - {}", info)
            } else {
                format!("Prelievo contanti - {}", details)
            }
        }
        "Bonif. v/fav." => {
            strip_reference_tokens(details).replace("Bonif. v/fav.", "Bonif. ricevuto")
        }
        "Disposizione" => {
            strip_reference_tokens(details).replace("Disposizione", "Bonif. effettuato")
        }
        _ => collapse_whitespace(details),
    }
}

fn extract_transaction_type(details: &str) -> String {
    let token = details.split('-').next().unwrap_or(details);
    resolve_type(token, ALLIANZ_TYPE_MAP, labels::ALTRO)
}
