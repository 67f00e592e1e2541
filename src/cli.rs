//! CLI implementation for ledgerctl
//!
//! Provides a developer-friendly command-line interface for inspecting
//! the deposit ledger. All commands output pretty JSON.

use crate::ledger::{TransactionRecord, TxStatus, NATIVE_TOKEN};
use crate::store::LedgerStore;
use crate::wallets::parse_address;
use crate::RocksLedgerStore;
use alloy_primitives::B256;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

/// Deposit ledger CLI tool
#[derive(Parser)]
#[command(name = "ledgerctl")]
#[command(about = "Deposit ledger CLI tool")]
pub struct Cli {
    /// Path to the RocksDB database directory
    #[arg(short, long, default_value = "./ledger_db")]
    db_path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get a record by transaction hash (and token address for token legs)
    Get {
        /// Transaction hash (hex, with or without 0x prefix)
        tx_hash: String,
        /// Token contract address; omit for the native leg
        #[arg(short, long)]
        token: Option<String>,
    },
    /// List all records filed under a wallet, in block order
    History {
        /// Wallet address (hex, with or without 0x prefix)
        wallet: String,
    },
    /// Summarize a wallet's deposits per token
    Stats {
        /// Wallet address (hex, with or without 0x prefix)
        wallet: String,
    },
}

/// Pad an odd-length hex string with a leading zero.
fn pad_hex_string(s: &str) -> String {
    if s.is_empty() {
        return s.to_string();
    }
    if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    }
}

/// Parse a hex string into a 32-byte hash (B256).
fn parse_hash(s: &str) -> Result<B256> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).with_context(|| format!("Invalid hex hash: {}", s))?;
    if bytes.len() != 32 {
        anyhow::bail!(
            "Hash must be 32 bytes (64 hex chars), got {} bytes",
            bytes.len()
        );
    }
    Ok(B256::from_slice(&bytes))
}

/// Render a record as JSON.
fn record_json(record: &TransactionRecord) -> Value {
    json!({
        "tx_hash": format!("0x{:x}", record.tx_hash),
        "type": record.record_type,
        "chain": record.chain,
        "from": format!("0x{:x}", record.from),
        "to": format!("0x{:x}", record.to),
        "wallet_address": format!("0x{:x}", record.wallet_address),
        "token_address": format!("0x{:x}", record.token_address),
        "token_symbol": record.token_symbol,
        "amount": record.amount.to_string(),
        "amount_formatted": record.amount_formatted,
        "block_number": record.block_number,
        "block_hash": format!("0x{:x}", record.block_hash),
        "timestamp": record.timestamp,
        "gas_used": record.gas_used.to_string(),
        "gas_price": record.gas_price.to_string(),
        "gas_fee": record.gas_fee.to_string(),
        "status": record.status,
        "confirmations": record.confirmations,
        "confirmed_at": record.confirmed_at,
    })
}

/// Run the CLI command and print JSON output.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let store = RocksLedgerStore::open(&cli.db_path)
        .with_context(|| format!("Failed to open database at {:?}", cli.db_path))?;

    let result = match cli.command {
        Commands::Get { tx_hash, token } => {
            let hash = parse_hash(&tx_hash)?;
            let token = match token {
                Some(token) => parse_address(&token)?,
                None => NATIVE_TOKEN,
            };
            match store.find_by_identity(hash, token)? {
                Some(record) => json!({
                    "tx_hash": format!("0x{:x}", hash),
                    "record": record_json(&record),
                }),
                None => json!({
                    "tx_hash": format!("0x{:x}", hash),
                    "record": null,
                }),
            }
        }
        Commands::History { wallet } => {
            let addr = parse_address(&wallet)?;
            let records = store.records_for_wallet(addr)?;
            json!({
                "wallet": format!("0x{:x}", addr),
                "count": records.len(),
                "records": records.iter().map(record_json).collect::<Vec<_>>(),
            })
        }
        Commands::Stats { wallet } => {
            let addr = parse_address(&wallet)?;
            let records = store.records_for_wallet(addr)?;

            let mut per_token: std::collections::BTreeMap<String, (usize, usize, usize)> =
                std::collections::BTreeMap::new();
            for record in &records {
                let entry = per_token
                    .entry(format!("0x{:x}", record.token_address))
                    .or_default();
                entry.0 += 1;
                match record.status {
                    TxStatus::Confirmed => entry.1 += 1,
                    TxStatus::Pending => entry.2 += 1,
                    TxStatus::Failed => {}
                }
            }

            json!({
                "wallet": format!("0x{:x}", addr),
                "total_records": records.len(),
                "per_token": per_token
                    .into_iter()
                    .map(|(token, (total, confirmed, pending))| json!({
                        "token_address": token,
                        "records": total,
                        "confirmed": confirmed,
                        "pending": pending,
                    }))
                    .collect::<Vec<_>>(),
            })
        }
    };

    // Pretty print JSON
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
