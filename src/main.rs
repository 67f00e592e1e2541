//! ledgerctl - deposit ledger CLI tool
//!
//! A developer-friendly command-line interface for inspecting deposit
//! records in a persistent RocksDB ledger.

use inlet::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
