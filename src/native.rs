//! Native-transfer scanner
//!
//! Inspects each transaction in a block for a direct value transfer to a
//! monitored wallet. The block is fetched hashes-only; transaction
//! bodies are pulled lazily, one at a time, so node load stays
//! proportional to block size. Per-transaction failures are logged and
//! never abort the block.

use crate::cache::ReceiptCache;
use crate::config::IndexerConfig;
use crate::fee;
use crate::indexer::ScanStats;
use crate::ledger::{DepositParams, LedgerWriter, ReceiptInfo, NATIVE_TOKEN};
use crate::retry::{with_retry, RetryPolicy};
use crate::rpc::ChainClient;
use crate::store::LedgerStore;
use crate::types::{Block, Receipt};
use alloy_primitives::{Address, B256, U256};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Fetch a receipt through the cache.
///
/// Only successful fetches are cached; `Ok(None)` (node does not have
/// the receipt yet) and errors stay uncached so later passes retry.
pub(crate) async fn fetch_receipt_cached<C: ChainClient>(
    chain: &C,
    cache: &mut ReceiptCache,
    retry: &RetryPolicy,
    tx_hash: B256,
) -> Result<Option<Receipt>, crate::rpc::RpcError> {
    if let Some(receipt) = cache.get(tx_hash) {
        return Ok(Some(receipt.clone()));
    }
    let receipt = with_retry(retry, "get_transaction_receipt", || {
        chain.get_transaction_receipt(tx_hash)
    })
    .await?;
    if let Some(receipt) = &receipt {
        cache.put(tx_hash, receipt.clone());
    }
    Ok(receipt)
}

/// Scan one block for native value transfers to monitored wallets.
pub async fn scan_block_native<C, S>(
    chain: &C,
    writer: &LedgerWriter<S>,
    block: &Block,
    wallets: &HashSet<Address>,
    receipts: &mut ReceiptCache,
    config: &IndexerConfig,
    tip_height: u64,
) -> ScanStats
where
    C: ChainClient,
    S: LedgerStore,
{
    let mut stats = ScanStats::default();
    // Suppresses duplicate fetches of a hash within this block's scan;
    // entries are removed on every exit path.
    let mut processing: HashSet<B256> = HashSet::new();

    for &tx_hash in &block.transactions {
        if !processing.insert(tx_hash) {
            continue;
        }

        let fetched = with_retry(&config.retry, "get_transaction", || {
            chain.get_transaction(tx_hash)
        })
        .await;
        processing.remove(&tx_hash);

        let tx = match fetched {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                debug!("transaction {:?} not found, skipping", tx_hash);
                continue;
            }
            Err(e) => {
                warn!("failed to fetch transaction {:?}: {}", tx_hash, e);
                stats.errors += 1;
                continue;
            }
        };

        let to = match tx.to {
            Some(to) if wallets.contains(&to) => to,
            _ => continue,
        };
        if tx.value == U256::ZERO {
            continue;
        }

        let receipt = match fetch_receipt_cached(chain, receipts, &config.retry, tx_hash).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!("failed to fetch receipt for {:?}: {}", tx_hash, e);
                stats.errors += 1;
                None
            }
        };

        // A reverted transaction moved no value
        if let Some(receipt) = &receipt {
            if !receipt.is_success() {
                debug!("transaction {:?} reverted, skipping", tx_hash);
                continue;
            }
        }

        let receipt_info = receipt.as_ref().map(|receipt| {
            let gas_price = match fee::effective_gas_price(&tx, receipt, block) {
                Ok(price) => price,
                Err(e) => {
                    warn!("could not derive gas price for {:?}: {}", tx_hash, e);
                    U256::ZERO
                }
            };
            ReceiptInfo {
                success: receipt.is_success(),
                gas_used: receipt.gas_used,
                gas_price,
            }
        });

        let params = DepositParams {
            wallet: to,
            from: tx.from,
            to,
            token: NATIVE_TOKEN,
            token_symbol: config.native_symbol.clone(),
            decimals: config.native_decimals,
            amount: tx.value,
            tx_hash,
            block_number: block.number,
            block_hash: block.hash,
            timestamp: block.timestamp,
            confirmations: tip_height.saturating_sub(block.number) + 1,
            receipt: receipt_info,
        };

        match writer.record_deposit(&params) {
            Ok(_) => stats.recorded += 1,
            Err(e) => {
                warn!("failed to record native deposit {:?}: {:#}", tx_hash, e);
                stats.errors += 1;
            }
        }
    }

    stats
}
