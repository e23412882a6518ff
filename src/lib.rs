//! Statement Harmonizer Library
//!
//! A library for ingesting heterogeneous bank-statement exports and
//! reconciling them against previously stored records.
//!
//! # Pipeline
//!
//! file → raw reader → bank parser (via registry) → canonical batch →
//! harmonizer (dedup against store) → persisted records ← raw-record linker
//!
//! # Features
//!
//! - Read spreadsheet and delimited-text exports with bank-specific
//!   header/footer skip conventions and encoding fallback
//! - One pluggable parser per supported bank (intesa, allianz, fineco),
//!   each deriving descriptions and transaction-type labels from the bank's
//!   free-text fields
//! - Duplicate-safe harmonization: re-uploading the same or an overlapping
//!   statement never inserts the same financial event twice
//! - Raw-row linkage for audit: the original bank-specific row is kept next
//!   to each persisted canonical record
//!
//! # Examples
//!
//! ## Ingesting and harmonizing one statement file
//!
//! ```no_run
//! use statement_harmonizer::harmonize::harmonize_and_insert;
//! use statement_harmonizer::ingest::parse_statement;
//! use statement_harmonizer::parsers::ParserRegistry;
//! use statement_harmonizer::raw_records::link_raw_records;
//! use statement_harmonizer::store::MemoryStore;
//! use std::path::Path;
//!
//! let registry = ParserRegistry::with_default_banks();
//! let batch = parse_statement(
//!     &registry,
//!     Path::new("movimenti.xlsx"),
//!     "intesa",
//!     "Conto Corrente",
//! )?;
//!
//! let mut store = MemoryStore::new();
//! let outcome =
//!     harmonize_and_insert(&mut store, &batch.transactions, &batch.bank, &batch.account, None)?;
//! println!("inserted {}, skipped {}", outcome.inserted, outcome.skipped);
//!
//! let raw_links = link_raw_records(&batch, &outcome);
//! println!("linked {} raw rows", raw_links.len());
//! # Ok::<(), statement_harmonizer::Error>(())
//! ```

pub mod error;
pub mod harmonize;
pub mod ingest;
pub mod normalize;
pub mod parsers;
pub mod raw_records;
pub mod reader;
pub mod store;
pub mod transaction_types;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use harmonize::{harmonize_and_insert, HarmonizationOutcome};
pub use ingest::{parse_statement, StatementBatch};
pub use parsers::{BankParser, ParserRegistry};
pub use store::{MemoryStore, TransactionStore};
pub use types::{CanonicalTransaction, ImportWarning, StoredTransaction, WarningKind};
