//! Tabular source reader.
//!
//! Opens a statement export and yields a row-oriented table of raw cell
//! values. The tabular kind is resolved from the file extension: spreadsheet
//! workbooks are read sheet by sheet until one contains data, delimited text
//! is decoded through a fixed ladder of encodings before parsing.

use crate::error::{Error, Result};
use calamine::{open_workbook_auto, Data, Reader};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::fmt;
use std::path::Path;

/// A single raw cell value as captured from the source file.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// True for empty cells and for text cells that are blank after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text content of the cell, trimmed. Numbers and booleans are formatted.
    pub fn as_text(&self) -> String {
        self.to_string().trim().to_string()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(n) => Cell::Number(*n),
            Data::Int(n) => Cell::Number(*n as f64),
            Data::Bool(b) => Cell::Bool(*b),
            // Serial datetimes are handled downstream by the date normalizer.
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(_) => Cell::Empty,
        }
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

/// A row-oriented table of raw cell values with the original header row.
///
/// The table is immutable once read; parsers look columns up by name and
/// never modify the captured cells, so the same table doubles as the raw
/// snapshot handed to the raw-record linker.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Build a table from a header row and data rows.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    /// Column headers as they appear in the source.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows, header row excluded.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolve a column index by name, ignoring case and surrounding
    /// whitespace in the header cell.
    pub fn column(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.headers
            .iter()
            .position(|h| h.trim().to_lowercase() == wanted)
    }

    /// True when every listed column resolves.
    pub fn has_columns(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.column(name).is_some())
    }

    /// Cell at (row, column); ragged rows yield an empty cell.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// Supported tabular source kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Multi-sheet spreadsheet workbook (.xlsx, .xls).
    Spreadsheet,
    /// Delimited text (.csv).
    DelimitedText,
}

/// Resolve the tabular kind from the file extension.
pub fn detect_kind(path: &Path) -> Result<SourceKind> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xls" => Ok(SourceKind::Spreadsheet),
        "csv" => Ok(SourceKind::DelimitedText),
        _ => Err(Error::UnsupportedFormat(format!(".{}", ext))),
    }
}

/// Read a tabular source into a [`RawTable`].
///
/// `skip_rows` leading rows are discarded before the header row is taken;
/// `skip_footer` trailing data rows are discarded. Both counts are
/// bank-specific and supplied by the caller.
///
/// # Errors
///
/// `UnsupportedFormat` for unrecognized extensions, `EmptySource` when the
/// resolved table has zero data rows, `UndecodableSource` when no supported
/// encoding decodes a delimited-text file.
pub fn read_table(path: &Path, skip_rows: usize, skip_footer: usize) -> Result<RawTable> {
    match detect_kind(path)? {
        SourceKind::Spreadsheet => read_spreadsheet(path, skip_rows, skip_footer),
        SourceKind::DelimitedText => read_delimited(path, skip_rows, skip_footer),
    }
}

fn read_spreadsheet(path: &Path, skip_rows: usize, skip_footer: usize) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path)?;

    // First sheet with at least one data row wins.
    let sheet_names = workbook.sheet_names().to_vec();
    for sheet_name in sheet_names {
        let range = match workbook.worksheet_range(&sheet_name) {
            Ok(range) => range,
            Err(_) => continue,
        };

        let mut rows = range.rows().skip(skip_rows);
        let headers: Vec<String> = match rows.next() {
            Some(header_row) => header_row.iter().map(|d| Cell::from(d).as_text()).collect(),
            None => continue,
        };

        let mut data: Vec<Vec<Cell>> = rows
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();
        data.truncate(data.len().saturating_sub(skip_footer));

        if !data.is_empty() {
            log::info!("Read sheet '{}' from {}", sheet_name, path.display());
            return Ok(RawTable::from_rows(headers, data));
        }
    }

    Err(Error::EmptySource(path.display().to_string()))
}

/// Encoding ladder for delimited text, tried in order. The single-byte legs
/// (latin-1, iso-8859-1, cp1252) all resolve to the Windows-1252 decoder,
/// which accepts any byte sequence.
static TEXT_ENCODINGS: &[&Encoding] = &[UTF_8, WINDOWS_1252];

fn decode_text(bytes: &[u8], path: &Path) -> Result<String> {
    for encoding in TEXT_ENCODINGS {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            log::info!(
                "Read file {} with encoding {}",
                path.display(),
                encoding.name()
            );
            return Ok(text.into_owned());
        }
    }
    Err(Error::UndecodableSource(path.display().to_string()))
}

fn read_delimited(path: &Path, skip_rows: usize, skip_footer: usize) -> Result<RawTable> {
    let bytes = std::fs::read(path)?;
    let text = decode_text(&bytes, path)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells: Vec<Cell> = record
            .iter()
            .map(|field| {
                if field.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        records.push(cells);
    }

    let mut rows = records.into_iter().skip(skip_rows);
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(Cell::as_text).collect())
        .ok_or_else(|| Error::EmptySource(path.display().to_string()))?;

    let mut data: Vec<Vec<Cell>> = rows.collect();
    data.truncate(data.len().saturating_sub(skip_footer));

    if data.is_empty() {
        return Err(Error::EmptySource(path.display().to_string()));
    }

    Ok(RawTable::from_rows(headers, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("statement_harmonizer_{}", name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(
            detect_kind(Path::new("a.xlsx")).unwrap(),
            SourceKind::Spreadsheet
        );
        assert_eq!(
            detect_kind(Path::new("a.XLS")).unwrap(),
            SourceKind::Spreadsheet
        );
        assert_eq!(
            detect_kind(Path::new("a.csv")).unwrap(),
            SourceKind::DelimitedText
        );
        assert!(matches!(
            detect_kind(Path::new("a.pdf")),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let table = RawTable::from_rows(
            vec!["  Data ".into(), "Importo".into()],
            vec![vec![Cell::Text("2024-01-01".into()), Cell::Number(10.0)]],
        );
        assert_eq!(table.column("data"), Some(0));
        assert_eq!(table.column("IMPORTO"), Some(1));
        assert_eq!(table.column("missing"), None);
        assert!(table.has_columns(&["data", "importo"]));
    }

    #[test]
    fn test_cell_out_of_bounds_is_empty() {
        let table = RawTable::from_rows(vec!["a".into()], vec![vec![Cell::Number(1.0)]]);
        assert_eq!(*table.cell(0, 5), Cell::Empty);
        assert_eq!(*table.cell(9, 0), Cell::Empty);
    }

    #[test]
    fn test_read_csv_with_skips() {
        let path = write_temp(
            "skips.csv",
            b"junk,junk\ndate,amount\n2024-01-01,10.00\n2024-01-02,20.00\ntotal,30.00\n",
        );
        let table = read_table(&path, 1, 1).unwrap();
        assert_eq!(table.headers(), &["date".to_string(), "amount".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, 1).as_text(), "20.00");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_read_csv_latin1_fallback() {
        // "Caffè" encoded as latin-1: 0xE8 is invalid UTF-8.
        let path = write_temp("latin1.csv", b"descrizione,importo\nCaff\xe8,-1.20\n");
        let table = read_table(&path, 0, 0).unwrap();
        assert_eq!(table.cell(0, 0).as_text(), "Caffè");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_read_empty_csv_is_empty_source() {
        let path = write_temp("empty.csv", b"date,amount\n");
        assert!(matches!(
            read_table(&path, 0, 0),
            Err(Error::EmptySource(_))
        ));
        std::fs::remove_file(path).ok();
    }
}
