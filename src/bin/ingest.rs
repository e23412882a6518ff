//! Statement Ingest - CLI tool for previewing a parsed bank statement.

use clap::Parser;
use statement_harmonizer::{parse_statement, ParserRegistry, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "statement_ingest")]
#[command(about = "Parse a bank statement export into canonical transactions", long_about = None)]
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

    println!(
        "{:<12} {:>12}  {:<24} {:<40}",
        "Date", "Amount", "Type", "Description"
    );
    println!("{}", "-".repeat(92));
    for transaction in &batch.transactions {
        println!(
            "{:<12} {:>12}  {:<24} {:<40}",
            transaction.date.to_string(),
            transaction.amount.to_string(),
            transaction.transaction_type.as_deref().unwrap_or("-"),
            transaction.description.as_deref().unwrap_or("-"),
        );
    }

    println!();
    println!("{} transaction(s) parsed", batch.transactions.len());
    if let Some((first, last)) = batch.date_range() {
        println!("Date range: {} .. {}", first, last);
    }
    if let Some(filename) = batch.archive_filename() {
        println!("Archive filename: {}", filename);
    }

    if !batch.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &batch.warnings {
            println!("  [{:?}] {}", warning.kind, warning.message);
        }
    }

    Ok(())
}
