//! Main indexer loop
//!
//! Orchestrates the cursor over chain heights: each tick snapshots the
//! wallet directory, fetches the current height, and drives the native
//! and token scanners over a bounded batch of unprocessed blocks. A tick
//! can fail without ever stopping the loop; the cursor advances past
//! attempted blocks even when their scan partially failed, so a single
//! bad block cannot stall the indexer (a separate backfill job covers
//! strict completeness).

use crate::cache::{ReceiptCache, TokenMetaCache};
use crate::config::IndexerConfig;
use crate::erc20::scan_block_tokens;
use crate::governor::RateGovernor;
use crate::ledger::LedgerWriter;
use crate::native::scan_block_native;
use crate::retry::with_retry;
use crate::rpc::ChainClient;
use crate::store::LedgerStore;
use crate::wallets::{snapshot, WalletDirectory};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Counters produced by one scanner pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanStats {
    /// Deposits handed to the ledger writer
    pub recorded: usize,
    /// Errors caught and logged
    pub errors: usize,
}

impl ScanStats {
    /// Fold another pass's counters into this one.
    pub fn absorb(&mut self, other: ScanStats) {
        self.recorded += other.recorded;
        self.errors += other.errors;
    }
}

/// Result of one processing tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickOutcome {
    /// Blocks attempted this tick
    pub processed: u64,
    /// Deposits recorded
    pub recorded: usize,
    /// Errors caught during scanning
    pub errors: usize,
}

/// Deposit indexer: watches the chain and files ledger records for
/// transfers addressed to monitored wallets.
///
/// All mutable state (`current_block`, the governor delay, the token
/// metadata cache) is owned here, so several instances can watch
/// different chains within one process.
pub struct Indexer<C, W, S> {
    chain: C,
    wallets: W,
    writer: LedgerWriter<S>,
    governor: RateGovernor,
    config: IndexerConfig,
    tokens: TokenMetaCache,
    current_block: u64,
}

impl<C, W, S> Indexer<C, W, S>
where
    C: ChainClient,
    W: WalletDirectory,
    S: LedgerStore,
{
    /// Create an indexer over the given collaborators.
    pub fn new(chain: C, wallets: W, store: S, config: IndexerConfig) -> Self {
        let governor = RateGovernor::new(config.min_delay, config.max_delay);
        let writer = LedgerWriter::new(store, config.chain.clone());
        Self {
            chain,
            wallets,
            writer,
            governor,
            config,
            tokens: TokenMetaCache::new(),
            current_block: 0,
        }
    }

    /// Highest block fully attempted so far.
    pub fn current_block(&self) -> u64 {
        self.current_block
    }

    /// Current governor delay (diagnostics).
    pub fn governor_delay(&self) -> Duration {
        self.governor.delay()
    }

    /// Set the starting cursor position.
    ///
    /// With a configured start block, scanning begins at that block;
    /// otherwise at the block after the current chain height, so
    /// deposits prior to startup are not retroactively indexed.
    pub async fn initialize(&mut self) -> Result<()> {
        self.current_block = match self.config.start_block {
            Some(start) => start.saturating_sub(1),
            None => with_retry(&self.config.retry, "get_block_number", || {
                self.chain.get_block_number()
            })
            .await
            .context("Failed to fetch chain height at startup")?,
        };
        info!(
            "Indexer initialized; scanning starts at block {}",
            self.current_block + 1
        );
        Ok(())
    }

    /// Run one processing tick.
    ///
    /// Never processes more than `max_blocks_per_tick` blocks; per-block
    /// failures are absorbed into the outcome. Errors returned here are
    /// tick-level (wallet directory or height fetch failures).
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        let addresses = self
            .wallets
            .list_wallet_addresses()
            .context("Failed to list wallet addresses")?;
        let wallet_set = snapshot(&addresses);

        let height = with_retry(&self.config.retry, "get_block_number", || {
            self.chain.get_block_number()
        })
        .await
        .context("Failed to fetch chain height")?;

        let blocks_to_process = height
            .saturating_sub(self.current_block)
            .min(self.config.max_blocks_per_tick);

        if blocks_to_process == 0 {
            debug!("caught up at block {}", self.current_block);
            return Ok(TickOutcome::default());
        }

        let mut outcome = TickOutcome {
            processed: blocks_to_process,
            ..TickOutcome::default()
        };

        if addresses.is_empty() {
            // Nothing to scan for; the cursor still advances
            debug!("no monitored wallets; skipping {} blocks", blocks_to_process);
            self.current_block += blocks_to_process;
            return Ok(outcome);
        }

        let first = self.current_block + 1;
        let last = self.current_block + blocks_to_process;
        for number in first..=last {
            let stats = self
                .process_block(number, &addresses, &wallet_set, height)
                .await;
            outcome.recorded += stats.recorded;
            outcome.errors += stats.errors;
            self.governor.pause().await;
        }

        // Advance past every attempted block, even partially failed ones
        self.current_block = last;

        if outcome.errors > 0 {
            self.governor.on_error();
        } else if outcome.processed > 0 {
            self.governor.on_success();
        }

        info!(
            "tick complete: blocks {}..={}, {} recorded, {} errors",
            first, last, outcome.recorded, outcome.errors
        );
        Ok(outcome)
    }

    /// Scan a single block with both scanners.
    ///
    /// Errors are absorbed into the returned stats; a block whose fetch
    /// failed outright counts one error and is otherwise skipped.
    async fn process_block(
        &mut self,
        number: u64,
        wallet_list: &[Address],
        wallet_set: &HashSet<Address>,
        tip_height: u64,
    ) -> ScanStats {
        let mut stats = ScanStats::default();

        let block = match with_retry(&self.config.retry, "get_block", || {
            self.chain.get_block(number, false)
        })
        .await
        {
            Ok(block) => block,
            Err(e) => {
                warn!("failed to fetch block {}: {}", number, e);
                stats.errors += 1;
                return stats;
            }
        };

        debug!(
            "processing block {} ({} transactions)",
            number,
            block.transactions.len()
        );

        let mut receipts = ReceiptCache::new();

        stats.absorb(
            scan_block_native(
                &self.chain,
                &self.writer,
                &block,
                wallet_set,
                &mut receipts,
                &self.config,
                tip_height,
            )
            .await,
        );

        stats.absorb(
            scan_block_tokens(
                &self.chain,
                &self.writer,
                &block,
                wallet_list,
                wallet_set,
                &mut receipts,
                &mut self.tokens,
                &self.governor,
                &self.config,
                tip_height,
            )
            .await,
        );

        stats
    }

    /// Run the indexer loop.
    ///
    /// Ticks are strictly non-overlapping: each awaits completion before
    /// the interval sleep starts, so a slow tick delays the next rather
    /// than running alongside it. Tick failures are logged and absorbed.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Starting indexer loop (tick every {:?}, max {} blocks per tick)",
            self.config.tick_interval, self.config.max_blocks_per_tick
        );

        loop {
            if let Err(e) = self.tick().await {
                warn!("tick failed: {:#}", e);
                self.governor.on_error();
            }
            tokio::time::sleep(self.config.tick_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{TxStatus, NATIVE_TOKEN};
    use crate::retry::RetryPolicy;
    use crate::test_support::{test_wallet, MemoryLedger, MockChain};
    use alloy_primitives::{address, U256};

    struct StaticWallets(Vec<Address>);

    impl WalletDirectory for StaticWallets {
        fn list_wallet_addresses(&self) -> Result<Vec<Address>> {
            Ok(self.0.clone())
        }
    }

    fn fast_config(start_block: Option<u64>) -> IndexerConfig {
        IndexerConfig {
            start_block,
            max_blocks_per_tick: 3,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(50),
            retry: RetryPolicy {
                attempts: 2,
                initial_delay: Duration::from_millis(1),
            },
            ..IndexerConfig::default()
        }
    }

    fn indexer(
        chain: MockChain,
        wallets: Vec<Address>,
        config: IndexerConfig,
    ) -> Indexer<MockChain, StaticWallets, MemoryLedger> {
        Indexer::new(chain, StaticWallets(wallets), MemoryLedger::new(), config)
    }

    #[tokio::test]
    async fn test_bounded_batch_and_cursor_monotonicity() {
        let chain = MockChain::new();
        chain.set_height(110);
        let mut idx = indexer(chain, vec![test_wallet()], fast_config(Some(101)));
        idx.initialize().await.unwrap();
        assert_eq!(idx.current_block(), 100);

        // 10 blocks behind, cap 3: exactly 3 per tick
        let outcome = idx.tick().await.unwrap();
        assert_eq!(outcome.processed, 3);
        assert_eq!(idx.current_block(), 103);

        let mut previous = idx.current_block();
        for _ in 0..4 {
            idx.tick().await.unwrap();
            assert!(idx.current_block() >= previous);
            assert!(idx.current_block() <= 110);
            previous = idx.current_block();
        }
        assert_eq!(idx.current_block(), 110);

        // Caught up: nothing to do
        let outcome = idx.tick().await.unwrap();
        assert_eq!(outcome.processed, 0);
        assert_eq!(idx.current_block(), 110);
    }

    #[tokio::test]
    async fn test_initialize_without_start_block_uses_chain_height() {
        let chain = MockChain::new();
        chain.set_height(500);
        let mut idx = indexer(chain, vec![test_wallet()], fast_config(None));
        idx.initialize().await.unwrap();
        assert_eq!(idx.current_block(), 500);
    }

    #[tokio::test]
    async fn test_native_deposit_end_to_end() {
        let wallet = test_wallet();
        let chain = MockChain::new();
        let tx_hash = chain.add_native_transfer(
            101,
            address!("0000000000000000000000000000000000000001"),
            wallet,
            U256::from(1_000_000_000_000_000_000u64),
        );
        let mut idx = indexer(chain, vec![wallet], fast_config(Some(101)));
        idx.initialize().await.unwrap();

        let outcome = idx.tick().await.unwrap();
        assert_eq!(outcome.processed, 1);
        assert_eq!(outcome.recorded, 1);
        assert_eq!(outcome.errors, 0);

        let record = idx.writer.store().get(tx_hash, NATIVE_TOKEN).unwrap();
        assert_eq!(record.status, TxStatus::Confirmed);
        assert_eq!(record.amount.to_string(), "1000000000000000000");
        assert_eq!(record.amount_formatted, "1.0");
        assert_eq!(record.token_address, NATIVE_TOKEN);
    }

    #[tokio::test]
    async fn test_replay_after_cursor_reset_is_idempotent() {
        // Restart replay from an earlier cursor must not duplicate records.
        let wallet = test_wallet();
        let chain = MockChain::new();
        chain.add_native_transfer(
            101,
            address!("0000000000000000000000000000000000000001"),
            wallet,
            U256::from(5u64),
        );
        let mut idx = indexer(chain, vec![wallet], fast_config(Some(101)));
        idx.initialize().await.unwrap();
        idx.tick().await.unwrap();
        assert_eq!(idx.writer.store().len(), 1);

        // Simulate a restart from the configured start height
        idx.initialize().await.unwrap();
        let outcome = idx.tick().await.unwrap();
        assert_eq!(outcome.errors, 0);
        assert_eq!(idx.writer.store().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_block_advances_cursor_and_grows_delay() {
        let wallet = test_wallet();
        let chain = MockChain::new();
        chain.set_height(102);
        chain.fail_block(101);
        let mut idx = indexer(chain, vec![wallet], fast_config(Some(101)));
        idx.initialize().await.unwrap();

        let before = idx.governor_delay();
        let outcome = idx.tick().await.unwrap();
        assert_eq!(outcome.processed, 2);
        assert!(outcome.errors >= 1);
        // Cursor moved past the bad block
        assert_eq!(idx.current_block(), 102);
        assert!(idx.governor_delay() > before);
    }

    #[tokio::test]
    async fn test_clean_ticks_shrink_delay_back_to_floor() {
        let wallet = test_wallet();
        let chain = MockChain::new();
        chain.set_height(120);
        chain.fail_block(101);
        let mut idx = indexer(chain, vec![wallet], fast_config(Some(101)));
        idx.initialize().await.unwrap();

        idx.tick().await.unwrap();
        let grown = idx.governor_delay();
        assert!(grown > Duration::from_millis(1));

        let mut last = grown;
        for _ in 0..3 {
            let outcome = idx.tick().await.unwrap();
            assert_eq!(outcome.errors, 0);
            assert!(idx.governor_delay() <= last);
            last = idx.governor_delay();
        }
        assert!(last < grown);
    }

    #[tokio::test]
    async fn test_empty_wallet_directory_advances_cursor() {
        let chain = MockChain::new();
        chain.set_height(105);
        let mut idx = indexer(chain, vec![], fast_config(Some(101)));
        idx.initialize().await.unwrap();

        let outcome = idx.tick().await.unwrap();
        assert_eq!(outcome.processed, 3);
        assert_eq!(outcome.recorded, 0);
        assert_eq!(idx.current_block(), 103);
    }
}
