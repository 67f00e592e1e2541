//! Deposit indexer binary
//!
//! Watches the chain for native and token transfers to monitored user
//! wallets and files each one as an idempotent ledger record.

use anyhow::{Context, Result};
use clap::Parser;
use inlet::config::IndexerConfig;
use inlet::indexer::Indexer;
use inlet::retry::RetryPolicy;
use inlet::rpc::RpcClient;
use inlet::store::RocksLedgerStore;
use inlet::wallets::FileWalletDirectory;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// On-chain deposit indexer
#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Index native and token deposits to monitored wallets")]
struct Args {
    /// RPC endpoint URL
    #[arg(short, long, env = "INLET_RPC_URL", default_value = "http://127.0.0.1:8545")]
    rpc_url: String,

    /// Chain tag stamped on every record
    #[arg(long, env = "INLET_CHAIN", default_value = "ethereum")]
    chain: String,

    /// Path to wallet file (one address per line)
    #[arg(short, long, env = "INLET_WALLETS", default_value = "wallets.txt")]
    wallets: PathBuf,

    /// Path to RocksDB database directory
    #[arg(short, long, env = "INLET_DB_PATH", default_value = "./ledger_db")]
    db_path: PathBuf,

    /// First block to scan (defaults to the chain height at startup)
    #[arg(long, env = "INLET_START_BLOCK")]
    start_block: Option<u64>,

    /// Seconds between processing ticks
    #[arg(long, env = "INLET_TICK_INTERVAL_SECS", default_value_t = 20)]
    tick_interval_secs: u64,

    /// Maximum blocks processed per tick
    #[arg(long, env = "INLET_MAX_BLOCKS_PER_TICK", default_value_t = 3)]
    max_blocks_per_tick: u64,

    /// Recipient topics per getLogs query
    #[arg(long, env = "INLET_TOPIC_CHUNK_SIZE", default_value_t = 4)]
    topic_chunk_size: usize,

    /// Rate governor floor in milliseconds
    #[arg(long, env = "INLET_MIN_DELAY_MS", default_value_t = 500)]
    min_delay_ms: u64,

    /// Rate governor cap in milliseconds
    #[arg(long, env = "INLET_MAX_DELAY_MS", default_value_t = 10_000)]
    max_delay_ms: u64,

    /// Retry attempts per chain read
    #[arg(long, env = "INLET_RETRY_ATTEMPTS", default_value_t = 3)]
    retry_attempts: u32,

    /// Confirmation depth reported on records
    #[arg(long, env = "INLET_CONFIRMATION_BLOCKS", default_value_t = 12)]
    confirmation_blocks: u64,

    /// Symbol of the chain's native unit
    #[arg(long, env = "INLET_NATIVE_SYMBOL", default_value = "ETH")]
    native_symbol: String,

    /// Decimal precision of the native unit
    #[arg(long, env = "INLET_NATIVE_DECIMALS", default_value_t = 18)]
    native_decimals: u8,
}

impl Args {
    fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            chain: self.chain.clone(),
            start_block: self.start_block,
            tick_interval: Duration::from_secs(self.tick_interval_secs),
            max_blocks_per_tick: self.max_blocks_per_tick,
            topic_chunk_size: self.topic_chunk_size,
            min_delay: Duration::from_millis(self.min_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            retry: RetryPolicy {
                attempts: self.retry_attempts,
                ..RetryPolicy::default()
            },
            confirmation_blocks: self.confirmation_blocks,
            native_symbol: self.native_symbol.clone(),
            native_decimals: self.native_decimals,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    info!("Starting deposit indexer");
    info!("RPC URL: {}", args.rpc_url);
    info!("Wallet file: {:?}", args.wallets);
    info!("Database: {:?}", args.db_path);

    let chain = RpcClient::new(args.rpc_url.clone());
    let wallets = FileWalletDirectory::new(args.wallets.clone());
    let store = RocksLedgerStore::open(&args.db_path)
        .with_context(|| format!("Failed to open database at {:?}", args.db_path))?;

    let mut indexer = Indexer::new(chain, wallets, store, args.indexer_config());
    indexer
        .initialize()
        .await
        .context("Failed to initialize indexer")?;

    // Handle Ctrl+C gracefully; the current tick finishes before exit
    tokio::select! {
        result = indexer.run() => {
            result.context("Indexer error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    info!("Indexer stopped");
    Ok(())
}
