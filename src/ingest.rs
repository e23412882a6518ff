//! File ingestion orchestrator.
//!
//! Drives the raw reader and the selected bank parser end to end for one
//! uploaded file: resolves the parser by explicit bank identifier, reads the
//! table with the parser's skip counts, stamps the account, collapses
//! intra-file duplicates and packages everything the downstream collaborators
//! need (raw table, raw-row keys, warnings, date range, archive filename).

use crate::error::{Error, Result};
use crate::parsers::ParserRegistry;
use crate::reader::{read_table, RawTable};
use crate::types::{CanonicalTransaction, ImportWarning, WarningKind};
use chrono::NaiveDate;
use serde_json::json;
use std::path::Path;

/// Everything produced by ingesting one statement file.
#[derive(Debug, Clone)]
pub struct StatementBatch {
    /// Bank identifier the file was parsed as.
    pub bank: String,

    /// Account the upload was declared for.
    pub account: String,

    /// Canonical transactions, intra-file duplicates already collapsed.
    pub transactions: Vec<CanonicalTransaction>,

    /// For each transaction, the raw table rows it was derived from
    /// (more than one after collapsing).
    pub raw_indices: Vec<Vec<usize>>,

    /// The table exactly as read from the file, for raw-record linkage.
    pub raw_table: RawTable,

    /// Structured warnings collected while parsing.
    pub warnings: Vec<ImportWarning>,

    /// Original file extension, dot included, lowercase.
    pub source_extension: String,
}

impl StatementBatch {
    /// First and last transaction date in the batch.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.transactions.iter().map(|t| t.date).min()?;
        let last = self.transactions.iter().map(|t| t.date).max()?;
        Some((first, last))
    }

    /// Stable filename for archiving the original upload:
    /// `{bank}_{account}_from_{date}_to_{date}{ext}`, lowercase with spaces
    /// replaced by underscores. `None` for an empty batch.
    pub fn archive_filename(&self) -> Option<String> {
        let (first, last) = self.date_range()?;
        Some(format!(
            "{}_{}_from_{}_to_{}{}",
            sanitize(&self.bank),
            sanitize(&self.account),
            first.format("%Y_%m_%d"),
            last.format("%Y_%m_%d"),
            self.source_extension
        ))
    }
}

fn sanitize(part: &str) -> String {
    part.trim().to_lowercase().replace(' ', "_")
}

/// Parse one statement file into a [`StatementBatch`].
///
/// The bank is always named explicitly; production uploads never guess the
/// format. Reader and parser errors propagate unchanged.
///
/// # Errors
///
/// `NoParserForBank` when the identifier is not registered, plus everything
/// [`read_table`] and the parser can fail with.
pub fn parse_statement(
    registry: &ParserRegistry,
    path: &Path,
    bank_id: &str,
    account: &str,
) -> Result<StatementBatch> {
    let parser = registry
        .by_bank_id(bank_id)
        .ok_or_else(|| Error::NoParserForBank(bank_id.to_string()))?;

    let table = read_table(path, parser.skip_rows(), parser.skip_footer())?;
    let mut parsed = parser.parse(&table)?;
    log::info!(
        "Parsed {} transactions from {}",
        parsed.rows.len(),
        path.display()
    );

    for row in &mut parsed.rows {
        row.transaction.account = account.to_string();
    }

    let mut warnings = parsed.warnings;
    let (transactions, raw_indices) = collapse_duplicates(parsed.rows, &mut warnings);

    let source_extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();

    Ok(StatementBatch {
        bank: parser.bank_id().to_string(),
        account: account.to_string(),
        transactions,
        raw_indices,
        raw_table: table,
        warnings,
        source_extension,
    })
}

/// Collapse rows identical on every canonical field except the amount.
///
/// Statements sometimes print one economic event as several line items; the
/// amounts are summed into one record and the contributing raw-row keys are
/// kept together.
fn collapse_duplicates(
    rows: Vec<crate::parsers::ParsedRow>,
    warnings: &mut Vec<ImportWarning>,
) -> (Vec<CanonicalTransaction>, Vec<Vec<usize>>) {
    let mut collapsed: Vec<(CanonicalTransaction, Vec<usize>, usize)> = Vec::new();

    for row in rows {
        let position = collapsed
            .iter()
            .position(|(tx, _, _)| tx.collapse_key() == row.transaction.collapse_key());
        match position {
            Some(i) => {
                collapsed[i].0.amount += row.transaction.amount;
                collapsed[i].1.push(row.raw_index);
                collapsed[i].2 += 1;
            }
            None => collapsed.push((row.transaction, vec![row.raw_index], 1)),
        }
    }

    let involved: usize = collapsed
        .iter()
        .map(|(_, _, members)| if *members > 1 { *members } else { 0 })
        .sum();
    if involved > 0 {
        log::warn!(
            "Found {} duplicate transactions within the file, summing the amounts",
            involved
        );
        warnings.push(
            ImportWarning::new(
                WarningKind::Duplicate,
                format!("Found {} duplicate transactions within the file", involved),
            )
            .with_details(json!({ "count": involved })),
        );
    }

    collapsed
        .into_iter()
        .map(|(tx, indices, _)| (tx, indices))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::ParsedRow;
    use crate::reader::Cell;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::io::Write;
    use std::path::PathBuf;
    use std::str::FromStr;

    fn transaction(amount: &str, description: &str) -> CanonicalTransaction {
        CanonicalTransaction {
            bank: "fineco".into(),
            account: "checking".into(),
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            amount: Decimal::from_str(amount).unwrap(),
            description: Some(description.into()),
            details: Some(description.into()),
            category: None,
            transaction_type: Some("Pagamento con carta".into()),
            is_special: false,
        }
    }

    #[test]
    fn test_collapse_sums_amounts_and_merges_raw_keys() {
        let rows = vec![
            ParsedRow {
                transaction: transaction("10.00", "coffee"),
                raw_index: 0,
            },
            ParsedRow {
                transaction: transaction("5.00", "coffee"),
                raw_index: 1,
            },
            ParsedRow {
                transaction: transaction("7.00", "bread"),
                raw_index: 2,
            },
        ];
        let mut warnings = Vec::new();
        let (transactions, raw_indices) = collapse_duplicates(rows, &mut warnings);

        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].amount, Decimal::from_str("15.00").unwrap());
        assert_eq!(raw_indices[0], vec![0, 1]);
        assert_eq!(raw_indices[1], vec![2]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::Duplicate);
    }

    #[test]
    fn test_collapse_keeps_distinct_rows() {
        let rows = vec![
            ParsedRow {
                transaction: transaction("10.00", "coffee"),
                raw_index: 0,
            },
            ParsedRow {
                transaction: transaction("10.00", "bread"),
                raw_index: 1,
            },
        ];
        let mut warnings = Vec::new();
        let (transactions, _) = collapse_duplicates(rows, &mut warnings);
        assert_eq!(transactions.len(), 2);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unknown_bank_fails() {
        let registry = ParserRegistry::with_default_banks();
        let err = parse_statement(
            &registry,
            Path::new("whatever.csv"),
            "unknown",
            "checking",
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoParserForBank(_)));
    }

    #[test]
    fn test_archive_filename_format() {
        let batch = StatementBatch {
            bank: "intesa".into(),
            account: "Conto Corrente".into(),
            transactions: vec![
                {
                    let mut t = transaction("1.00", "a");
                    t.date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
                    t
                },
                {
                    let mut t = transaction("2.00", "b");
                    t.date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
                    t
                },
            ],
            raw_indices: vec![vec![0], vec![1]],
            raw_table: RawTable::from_rows(vec![], vec![]),
            warnings: vec![],
            source_extension: ".xlsx".into(),
        };
        assert_eq!(
            batch.archive_filename().as_deref(),
            Some("intesa_conto_corrente_from_2024_01_05_to_2024_01_15.xlsx")
        );
    }

    #[test]
    fn test_empty_batch_has_no_archive_filename() {
        let batch = StatementBatch {
            bank: "intesa".into(),
            account: "c".into(),
            transactions: vec![],
            raw_indices: vec![],
            raw_table: RawTable::from_rows(vec![], vec![]),
            warnings: vec![],
            source_extension: ".csv".into(),
        };
        assert_eq!(batch.archive_filename(), None);
        assert_eq!(batch.date_range(), None);
    }

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("statement_harmonizer_{}", name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_statement_end_to_end() {
        let mut contents = String::new();
        // Fineco exports carry a 12-row preamble before the header.
        for i in 0..12 {
            contents.push_str(&format!("preamble {}\n", i));
        }
        contents.push_str("data_valuta,entrate,uscite,descrizione,descrizione_completa\n");
        contents.push_str("2024-05-02,,-37.90,Pagamento Visa Debit,Pag. Visa FARMACIA\n");
        contents.push_str("2024-05-03,120.00,,Bonifico,Bonifico da ROSSI\n");

        let path = write_temp("fineco_e2e.csv", &contents);
        let registry = ParserRegistry::with_default_banks();
        let batch = parse_statement(&registry, &path, "fineco", "Conto Fineco").unwrap();

        assert_eq!(batch.transactions.len(), 2);
        assert!(batch
            .transactions
            .iter()
            .all(|t| t.account == "Conto Fineco"));
        assert_eq!(
            batch.date_range(),
            Some((
                NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 3).unwrap()
            ))
        );
        assert_eq!(
            batch.archive_filename().as_deref(),
            Some("fineco_conto_fineco_from_2024_05_02_to_2024_05_03.csv")
        );
        assert_eq!(batch.raw_table.len(), 2);
        std::fs::remove_file(path).ok();
    }
}
