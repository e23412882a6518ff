//! Statement Import - CLI tool for harmonizing a statement into a JSON store.
//!
//! Parses the file, reconciles it against the records already in the store
//! document, asks for confirmation when duplicates are found, commits the
//! new records and links the original raw rows to them.

use clap::Parser;
use statement_harmonizer::harmonize::{harmonize_and_insert, DuplicateReview};
use statement_harmonizer::raw_records::link_raw_records;
use statement_harmonizer::{
    parse_statement, CanonicalTransaction, Error, MemoryStore, ParserRegistry, Result,
    StoredTransaction,
};
use chrono::NaiveDate;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "statement_import")]
#[command(about = "Harmonize a bank statement export into a transaction store", long_about = None)]
struct Cli {
    /// Input statement file (.xlsx, .xls, .csv)
    #[arg(short, long)]
    input: PathBuf,

    /// Bank identifier (intesa, allianz, fineco)
    #[arg(short, long)]
    bank: String,

    /// Account the statement belongs to
    #[arg(short, long)]
    account: String,

    /// Transaction store document
    #[arg(short, long, default_value = "transactions.json")]
    database: PathBuf,

    /// Insert without asking for confirmation on duplicates
    #[arg(short, long)]
    yes: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let registry = ParserRegistry::with_default_banks();
    let batch = parse_statement(&registry, &cli.input, &cli.bank, &cli.account)?;
    println!("Parsed {} transaction(s) from {}", batch.transactions.len(), cli.input.display());
    for warning in &batch.warnings {
        println!("  warning [{:?}]: {}", warning.kind, warning.message);
    }

    let mut store = load_store(&cli.database)?;

    let mut review = PromptReview {
        bank: batch.bank.clone(),
        account: batch.account.clone(),
    };
    let review: Option<&mut dyn DuplicateReview> = if cli.yes { None } else { Some(&mut review) };

    let outcome = harmonize_and_insert(
        &mut store,
        &batch.transactions,
        &batch.bank,
        &batch.account,
        review,
    )?;

    println!(
        "Inserted {} transaction(s), skipped {} duplicate(s)",
        outcome.inserted, outcome.skipped
    );

    let raw_links = link_raw_records(&batch, &outcome);
    if !raw_links.is_empty() {
        println!("Linked {} raw row(s) for audit", raw_links.len());
    }

    if outcome.inserted > 0 {
        save_store(&cli.database, &store)?;
        println!("Store written to {}", cli.database.display());
        if let Some(filename) = batch.archive_filename() {
            println!("Suggested archive filename: {}", filename);
        }
    }

    Ok(())
}

fn load_store(path: &Path) -> Result<MemoryStore> {
    if !path.exists() {
        return Ok(MemoryStore::new());
    }
    let contents = std::fs::read_to_string(path)?;
    let records: Vec<StoredTransaction> = serde_json::from_str(&contents)
        .map_err(|e| Error::InsertFailure(format!("unreadable store document: {}", e)))?;
    Ok(MemoryStore::from_records(records))
}

fn save_store(path: &Path, store: &MemoryStore) -> Result<()> {
    let contents = serde_json::to_string_pretty(store.records())
        .map_err(|e| Error::InsertFailure(e.to_string()))?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Interactive confirmation gate: renders the duplicates and asks y/n.
struct PromptReview {
    bank: String,
    account: String,
}

impl DuplicateReview for PromptReview {
    fn confirm(
        &mut self,
        duplicates: &[&CanonicalTransaction],
        last_observed: Option<NaiveDate>,
    ) -> bool {
        println!();
        println!("{}", "=".repeat(60));
        println!("DUPLICATE TRANSACTIONS FOUND");
        println!("{}", "=".repeat(60));
        println!("Bank: {}", self.bank);
        println!("Account: {}", self.account);
        match last_observed {
            Some(date) => println!("Last observation date: {}", date),
            None => println!("Last observation date: No previous transactions"),
        }
        println!();
        println!("Found {} duplicate transaction(s):", duplicates.len());
        println!();
        println!("{:<4} {:<12} {:>12} {:<40}", "#", "Date", "Amount", "Description");
        println!("{}", "-".repeat(70));
        for (i, duplicate) in duplicates.iter().enumerate() {
            let description = duplicate.description.as_deref().unwrap_or("N/A");
            let truncated: String = description.chars().take(38).collect();
            println!(
                "{:<4} {:<12} {:>12} {:<40}",
                i + 1,
                duplicate.date.to_string(),
                duplicate.amount.to_string(),
                truncated,
            );
        }
        println!("{}", "=".repeat(60));
        println!();

        print!("Proceed with insertion? (y/n): ");
        io::stdout().flush().ok();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}
