//! Intesa statement parser.
//!
//! Intesa exports a spreadsheet with 18 preamble rows before the column
//! header. The interesting work is deriving a readable description and a
//! transaction-type label from the free-text `operazione`/`dettagli` pair,
//! whose wording differs per operation kind.

use super::{BankParser, ParsedRow, ParsedStatement};
use crate::error::{Error, Result};
use crate::normalize::{normalize_amount, normalize_date};
use crate::reader::RawTable;
use crate::transaction_types::{labels, resolve_type, INTESA_TYPE_MAP};
use crate::types::{CanonicalTransaction, ImportWarning, WarningKind};
use serde_json::json;

pub const BANK_ID: &str = "intesa";

/// Rows carrying this operation marker are transfer instructions without a
/// matching settlement detail and are dropped.
const TRANSFER_INSTRUCTION_MARKER: &str = "Disposizione Di Bonifico";

pub struct IntesaParser;

impl IntesaParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IntesaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for IntesaParser {
    fn bank_id(&self) -> &'static str {
        BANK_ID
    }

    fn skip_rows(&self) -> usize {
        18
    }

    fn can_parse(&self, table: &RawTable, _filename: Option<&str>) -> bool {
        table.has_columns(&["data", "importo"])
    }

    fn parse(&self, table: &RawTable) -> Result<ParsedStatement> {
        let columns = Columns::resolve(table)?;
        let mut parsed = ParsedStatement::default();
        let mut filtered_rows: Vec<usize> = Vec::new();

        for (index, _) in table.rows().iter().enumerate() {
            let operazione = table.cell(index, columns.operazione).as_text();
            let dettagli = table.cell(index, columns.dettagli).as_text();
            let conto_o_carta = table.cell(index, columns.conto_o_carta).as_text();

            if operazione == TRANSFER_INSTRUCTION_MARKER {
                log::warn!(
                    "Dropping transfer instruction row {} without settlement detail",
                    index
                );
                filtered_rows.push(index);
                continue;
            }

            let date = match normalize_date(table.cell(index, columns.data)) {
                Ok(date) => date,
                Err(e) => {
                    log::warn!("Skipping row {}: {}", index, e);
                    parsed.warnings.push(row_error_warning(index, &e));
                    continue;
                }
            };
            let amount = match normalize_amount(table.cell(index, columns.importo)) {
                Ok(amount) => amount,
                Err(e) => {
                    log::warn!("Skipping row {}: {}", index, e);
                    parsed.warnings.push(row_error_warning(index, &e));
                    continue;
                }
            };

            let description = extract_description(&operazione, &dettagli, &conto_o_carta);
            let transaction_type =
                extract_transaction_type(&operazione, &dettagli, &conto_o_carta);
            let details = format!("{} - {}", dettagli, conto_o_carta);
            let category = columns
                .categoria
                .map(|col| table.cell(index, col).as_text())
                .filter(|s| !s.is_empty());

            parsed.rows.push(ParsedRow {
                transaction: CanonicalTransaction {
                    bank: BANK_ID.to_string(),
                    account: String::new(),
                    date,
                    amount,
                    description: Some(description),
                    details: Some(details),
                    category,
                    transaction_type: Some(transaction_type),
                    is_special: false,
                },
                raw_index: index,
            });
        }

        if !filtered_rows.is_empty() {
            parsed.warnings.push(
                ImportWarning::new(
                    WarningKind::FilteredRow,
                    format!(
                        "Dropped {} '{}' row(s) without settlement detail",
                        filtered_rows.len(),
                        TRANSFER_INSTRUCTION_MARKER
                    ),
                )
                .with_details(json!({ "rows": filtered_rows })),
            );
        }

        Ok(parsed)
    }
}

struct Columns {
    data: usize,
    operazione: usize,
    dettagli: usize,
    conto_o_carta: usize,
    importo: usize,
    categoria: Option<usize>,
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
            data: required("data")?,
            operazione: required("operazione")?,
            dettagli: required("dettagli")?,
            conto_o_carta: required("conto o carta")?,
            importo: required("importo")?,
            categoria: table.column("categoria"),
        })
    }
}

fn row_error_warning(index: usize, error: &Error) -> ImportWarning {
    ImportWarning::new(WarningKind::ParsingError, error.to_string())
        .with_details(json!({ "row": index }))
}

/// Uppercase the first character, lower the rest.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Derive a human-readable description from the operation and detail text.
///
/// The rules only apply to account rows (`conto o carta` names an account or
/// is blank); card rows keep the raw detail text.
fn extract_description(operazione: &str, dettagli: &str, conto_o_carta: &str) -> String {
    if !conto_o_carta.contains("Conto") && !conto_o_carta.trim().is_empty() {
        if !conto_o_carta.to_uppercase().contains("SUPERFLASH") {
            log::warn!(
                "Could not extract description for operazione: {} with details: {} and conto o carta: {}. Defaulting to details.",
                operazione,
                dettagli,
                conto_o_carta
            );
        }
        return dettagli.to_string();
    }

    if operazione.trim().to_uppercase() == "ACCREDITO BEU CON CONTABILE" {
        return dettagli.to_string();
    }
    if operazione.contains("Addebito Diretto") {
        return operazione.to_string();
    }
    if dettagli.contains("Carta N.") {
        return format!("Pagam. POS - {}", operazione);
    }
    if operazione.contains("Bonifico Disposto A Favore Di")
        || operazione.contains("Bonifico Istantaneo Da Voi Disposto A Favore Di")
    {
        // The beneficiary sits after the boilerplate in the detail text.
        if let Some(beneficiary) = dettagli.split("Bonifico Da Voi Disposto A Favore Di").nth(1) {
            return format!("Bonifico a {}", beneficiary.trim());
        }
        return format!("Bonifico a {}", dettagli);
    }
    if operazione.contains("Bonifico Disposto Da")
        || operazione.contains("Bonifico Istantaneo Disposto Da")
    {
        // Detail text is "COD.[...]DISP. <digits> <CASH/OTHR/SECU> <reason>
        // Bonifico A Vostro Favore"; keep the reason.
        if dettagli.contains("Bonifico A Vostro Favore") {
            let head: String = dettagli.chars().take(32).collect();
            let reason = head
                .split("Bonifico A Vostro Favore")
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            return format!("{} - {}", operazione, reason);
        }
        return format!("{} - {}", operazione, dettagli);
    }

    let operazione_lower = operazione.to_lowercase();
    if operazione_lower.contains("canone") || operazione_lower.contains("imposta di bollo") {
        return format!("{} - {}", capitalize(operazione), dettagli);
    }
    if operazione_lower.contains("investimento") {
        return format!("Investimento - {}", dettagli);
    }
    if operazione.to_uppercase().contains("BANCOMAT PAY") {
        return format!("BANCOMAT Pay - {}", dettagli);
    }
    if operazione.contains("Pagamento Delega F24") || operazione.contains("Pagamento Mav") {
        return format!("{} - {}", operazione, dettagli);
    }
    if operazione_lower.contains("premio polizza") {
        return format!("{} - {}", capitalize(operazione), capitalize(dettagli));
    }
    if operazione_lower.contains("stipendio") {
        if let Some(rest) = dettagli.split("STIPENDIO").nth(1) {
            let salary_info = rest
                .split("Bonifico A Vostro Favore")
                .next()
                .unwrap_or("")
                .trim();
            return format!("Stipendio - {}", salary_info);
        }
        return format!("Stipendio - {}", dettagli);
    }
    if operazione_lower.contains("assegn") {
        return format!("{} - {}", operazione, dettagli);
    }

    if !dettagli.is_empty() {
        dettagli.to_string()
    } else {
        operazione.to_string()
    }
}

fn extract_transaction_type(operazione: &str, dettagli: &str, conto_o_carta: &str) -> String {
    // Card rows (anything that is not an account) are prepaid-card spend.
    if !conto_o_carta.trim().is_empty() && !conto_o_carta.contains("Conto") {
        return labels::CARTA_PREPAGATA.to_string();
    }
    // POS payments are flagged in the detail text, not the operation field.
    if dettagli.contains("Carta N.") {
        return labels::PAGAMENTO_CON_CARTA.to_string();
    }
    resolve_type(operazione, INTESA_TYPE_MAP, labels::ALTRO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Cell;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn headers() -> Vec<String> {
        ["data", "operazione", "dettagli", "conto o carta", "categoria", "importo"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn row(
        data: &str,
        operazione: &str,
        dettagli: &str,
        conto: &str,
        categoria: &str,
        importo: &str,
    ) -> Vec<Cell> {
        vec![
            Cell::Text(data.into()),
            Cell::Text(operazione.into()),
            Cell::Text(dettagli.into()),
            Cell::Text(conto.into()),
            Cell::Text(categoria.into()),
            Cell::Text(importo.into()),
        ]
    }

    #[test]
    fn test_can_parse_needs_data_and_importo() {
        let parser = IntesaParser::new();
        let table = RawTable::from_rows(headers(), vec![]);
        assert!(parser.can_parse(&table, None));
        let other = RawTable::from_rows(vec!["date".into(), "amount".into()], vec![]);
        assert!(!other.has_columns(&["data", "importo"]));
        assert!(!parser.can_parse(&other, None));
    }

    #[test]
    fn test_outgoing_transfer_description_and_type() {
        let parser = IntesaParser::new();
        let table = RawTable::from_rows(
            headers(),
            vec![row(
                "2024-02-12",
                "Bonifico Disposto A Favore Di ACME",
                "Bonifico Da Voi Disposto A Favore Di ACME SRL",
                "Conto 1234",
                "",
                "-250,00",
            )],
        );
        let parsed = parser.parse(&table).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        let tx = &parsed.rows[0].transaction;
        assert_eq!(tx.description.as_deref(), Some("Bonifico a ACME SRL"));
        assert_eq!(tx.transaction_type.as_deref(), Some("Bonifico effettuato"));
        assert_eq!(tx.amount, Decimal::from_str("-250.00").unwrap());
    }

    #[test]
    fn test_transfer_instruction_rows_are_filtered() {
        let parser = IntesaParser::new();
        let table = RawTable::from_rows(
            headers(),
            vec![
                row(
                    "2024-02-12",
                    "Disposizione Di Bonifico",
                    "whatever",
                    "Conto 1234",
                    "",
                    "-10,00",
                ),
                row(
                    "2024-02-13",
                    "Pagamento Mav",
                    "bolletta",
                    "Conto 1234",
                    "",
                    "-20,00",
                ),
            ],
        );
        let parsed = parser.parse(&table).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].raw_index, 1);
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].kind, WarningKind::FilteredRow);
    }

    #[test]
    fn test_bad_row_is_skipped_with_warning() {
        let parser = IntesaParser::new();
        let table = RawTable::from_rows(
            headers(),
            vec![
                row("not a date", "Giroconto", "x", "Conto 1", "", "-1,00"),
                row("2024-03-01", "Giroconto", "x", "Conto 1", "", "-1,00"),
            ],
        );
        let parsed = parser.parse(&table).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].kind, WarningKind::ParsingError);
    }

    #[test]
    fn test_missing_column_is_structural_mismatch() {
        let parser = IntesaParser::new();
        let table = RawTable::from_rows(
            vec!["data".into(), "importo".into()],
            vec![vec![Cell::Text("2024-01-01".into()), Cell::Number(1.0)]],
        );
        match parser.parse(&table) {
            Err(Error::StructuralMismatch { bank, column }) => {
                assert_eq!(bank, "intesa");
                assert_eq!(column, "operazione");
            }
            other => panic!("expected StructuralMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_card_row_keeps_details_and_prepaid_type() {
        let parser = IntesaParser::new();
        let table = RawTable::from_rows(
            headers(),
            vec![row(
                "2024-04-02",
                "Pagamento effettuato il 01/04",
                "ESSELUNGA MILANO",
                "XXXX Carta Superflash",
                "Spesa",
                "-42,10",
            )],
        );
        let parsed = parser.parse(&table).unwrap();
        let tx = &parsed.rows[0].transaction;
        assert_eq!(tx.description.as_deref(), Some("ESSELUNGA MILANO"));
        assert_eq!(tx.transaction_type.as_deref(), Some("Carta prepagata"));
        assert_eq!(tx.category.as_deref(), Some("Spesa"));
        assert_eq!(
            tx.details.as_deref(),
            Some("ESSELUNGA MILANO - XXXX Carta Superflash")
        );
    }

    #[test]
    fn test_pos_payment_from_account() {
        let parser = IntesaParser::new();
        let table = RawTable::from_rows(
            headers(),
            vec![row(
                "2024-04-03",
                "Pagamento Tramite Pos",
                "Carta N. 1234 ESSELUNGA",
                "Conto 1",
                "",
                "-15,00",
            )],
        );
        let parsed = parser.parse(&table).unwrap();
        let tx = &parsed.rows[0].transaction;
        assert_eq!(
            tx.description.as_deref(),
            Some("Pagam. POS - Pagamento Tramite Pos")
        );
        assert_eq!(tx.transaction_type.as_deref(), Some("Pagamento con carta"));
    }

    #[test]
    fn test_salary_extraction() {
        let parser = IntesaParser::new();
        let table = RawTable::from_rows(
            headers(),
            vec![row(
                "2024-04-27",
                "Stipendio O Pensione",
                "STIPENDIO APRILE Bonifico A Vostro Favore",
                "Conto 1",
                "",
                "2.100,00",
            )],
        );
        let parsed = parser.parse(&table).unwrap();
        let tx = &parsed.rows[0].transaction;
        assert_eq!(tx.description.as_deref(), Some("Stipendio - APRILE"));
        assert_eq!(tx.transaction_type.as_deref(), Some("Stipendio"));
    }
}
