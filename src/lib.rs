//! Inlet - on-chain deposit indexer
//!
//! Watches an EVM chain for value transfers (native coin and ERC-20
//! tokens) addressed to a set of monitored user wallets, and converts
//! each observed transfer into an idempotent, auditable ledger entry.

pub mod cache;
pub mod cli;
pub mod config;
pub mod erc20;
pub mod fee;
pub mod governor;
pub mod indexer;
pub mod keys;
pub mod ledger;
pub mod native;
pub mod retry;
pub mod rpc;
pub mod store;
pub mod token;
pub mod types;
pub mod wallets;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export the main types for convenience
pub use config::IndexerConfig;
pub use indexer::Indexer;
pub use ledger::{LedgerWriter, RecordType, TransactionRecord, TxStatus, NATIVE_TOKEN};
pub use rpc::{ChainClient, RpcClient, RpcError};
pub use store::{LedgerStore, RocksLedgerStore, StatusPromotion};
pub use wallets::{FileWalletDirectory, WalletDirectory};
