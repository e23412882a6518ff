//! Bank-specific statement parsers.
//!
//! Each supported bank format implements [`BankParser`]; the closed set of
//! implementations is collected in a [`ParserRegistry`] built once at
//! startup and read-only thereafter.

pub mod allianz;
pub mod fineco;
pub mod intesa;

use crate::error::Result;
use crate::reader::RawTable;
use crate::types::{CanonicalTransaction, ImportWarning};

pub use allianz::AllianzParser;
pub use fineco::FinecoParser;
pub use intesa::IntesaParser;

/// One canonical transaction together with the index of the raw table row
/// it was derived from. The raw-row key travels with the record all the way
/// to the raw-record linker, so filtered or collapsed rows can never
/// misalign the remaining ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub transaction: CanonicalTransaction,
    pub raw_index: usize,
}

/// Output of one parse call: the surviving rows plus the warnings collected
/// along the way. Rows that fail normalization are reported here, never
/// thrown.
#[derive(Debug, Clone, Default)]
pub struct ParsedStatement {
    pub rows: Vec<ParsedRow>,
    pub warnings: Vec<ImportWarning>,
}

/// Capability interface for one bank's export shape.
pub trait BankParser {
    /// Stable lowercase identifier of the bank format.
    fn bank_id(&self) -> &'static str;

    /// Header rows to discard before the column row.
    fn skip_rows(&self) -> usize {
        0
    }

    /// Trailing rows to discard.
    fn skip_footer(&self) -> usize {
        0
    }

    /// Cheap structural check: does this table look like the bank's export?
    /// Must never fail; anything uncertain is "cannot parse".
    fn can_parse(&self, table: &RawTable, filename: Option<&str>) -> bool;

    /// Transform a raw table into canonical transactions.
    ///
    /// A row that fails normalization is logged, reported as a warning and
    /// dropped; a missing expected column fails the whole file with
    /// `StructuralMismatch`.
    fn parse(&self, table: &RawTable) -> Result<ParsedStatement>;
}

/// Registry of the closed bank-parser set.
///
/// Bank identifiers are unique case-insensitively; lookup by id is
/// case-insensitive and independent of registration order, while
/// [`ParserRegistry::detect`] probes `can_parse` in registration order.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: Vec<Box<dyn BankParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every production bank format.
    pub fn with_default_banks() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(IntesaParser::new()));
        registry.register(Box::new(AllianzParser::new()));
        registry.register(Box::new(FinecoParser::new()));
        registry
    }

    /// Register a parser. A bank id that is already present
    /// (case-insensitively) is logged and ignored, keeping the first
    /// registration.
    pub fn register(&mut self, parser: Box<dyn BankParser>) {
        if self.by_bank_id(parser.bank_id()).is_some() {
            log::warn!(
                "Parser for bank '{}' already registered, ignoring",
                parser.bank_id()
            );
            return;
        }
        log::info!("Registered parser for bank: {}", parser.bank_id());
        self.parsers.push(parser);
    }

    /// Look a parser up by bank identifier, case-insensitively.
    pub fn by_bank_id(&self, bank_id: &str) -> Option<&dyn BankParser> {
        self.parsers
            .iter()
            .find(|p| p.bank_id().eq_ignore_ascii_case(bank_id.trim()))
            .map(|p| p.as_ref())
    }

    /// Probe `can_parse` in registration order; first match wins.
    pub fn detect(&self, table: &RawTable, filename: Option<&str>) -> Option<&dyn BankParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(table, filename))
            .map(|p| p.as_ref())
    }

    /// Registered bank identifiers, in registration order.
    pub fn bank_ids(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.bank_id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_lookup() {
        let registry = ParserRegistry::with_default_banks();
        assert!(registry.by_bank_id("intesa").is_some());
        assert!(registry.by_bank_id("INTESA").is_some());
        assert!(registry.by_bank_id(" Allianz ").is_some());
        assert!(registry.by_bank_id("fineco").is_some());
        assert!(registry.by_bank_id("unknown").is_none());
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let mut registry = ParserRegistry::with_default_banks();
        let before = registry.bank_ids().len();
        registry.register(Box::new(IntesaParser::new()));
        assert_eq!(registry.bank_ids().len(), before);
    }
}
