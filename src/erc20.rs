//! Token-transfer scanner
//!
//! For a token transfer the transaction's `to` field is the token
//! contract, not the recipient, so recipient detection inspects the
//! standard Transfer event log and matches its `to` topic against the
//! monitored wallets. Providers cap the size of a `getLogs` topic list,
//! so queries go out in chunks with a single-address fallback when a
//! chunk is rejected as too broad.

use crate::cache::{ReceiptCache, TokenMetaCache};
use crate::config::IndexerConfig;
use crate::governor::RateGovernor;
use crate::indexer::ScanStats;
use crate::ledger::{DepositParams, LedgerWriter, ReceiptInfo};
use crate::native::fetch_receipt_cached;
use crate::rpc::{ChainClient, RpcError};
use crate::store::LedgerStore;
use crate::token::resolve_token_info;
use crate::types::{Block, Log, LogFilter};
use alloy_primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use std::collections::HashSet;
use tracing::{debug, warn};

/// keccak256("Transfer(address,address,uint256)")
const TRANSFER_TOPIC: [u8; 32] = [
    0xdd, 0xf2, 0x52, 0xad, 0x1b, 0xe2, 0xc8, 0x9b, 0x69, 0xc2, 0xb0, 0x68, 0xfc, 0x37, 0x8d,
    0xaa, 0x95, 0x2b, 0xa7, 0xf1, 0x63, 0xc4, 0xa1, 0x16, 0x28, 0xf5, 0x5a, 0x4d, 0xf5, 0x23,
    0xb3, 0xef,
];

/// Hex form of [`TRANSFER_TOPIC`] used in log filters.
const TRANSFER_TOPIC_HEX: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// Pad a wallet address into a 32-byte topic filter value.
pub fn wallet_topic(addr: Address) -> String {
    format!("0x000000000000000000000000{:x}", addr)
}

/// Build the Transfer-event filter for one block and one recipient chunk.
fn transfer_filter(block_number: u64, chunk: &[Address]) -> LogFilter {
    LogFilter {
        from_block: block_number,
        to_block: block_number,
        topics: vec![
            Some(vec![TRANSFER_TOPIC_HEX.to_string()]),
            None,
            Some(chunk.iter().map(|&a| wallet_topic(a)).collect()),
        ],
    }
}

/// Check that a log is a well-formed Transfer event.
fn is_transfer_log(log: &Log) -> bool {
    let Some(topic0) = log.topics.first() else {
        return false;
    };
    let topic0 = topic0.strip_prefix("0x").unwrap_or(topic0);
    if topic0.len() != 64 {
        return false;
    }
    match hex::decode(topic0) {
        Ok(bytes) => bytes.as_slice() == TRANSFER_TOPIC,
        Err(_) => false,
    }
}

/// Parse from, to, value from a Transfer log.
/// topics[1] = from (indexed, padded to 32 bytes), topics[2] = to, data = value
fn decode_transfer_log(log: &Log) -> Result<(Address, Address, U256)> {
    if log.topics.len() < 3 {
        anyhow::bail!("Transfer log has insufficient topics");
    }
    let from = parse_address_from_topic(&log.topics[1])?;
    let to = parse_address_from_topic(&log.topics[2])?;
    let value = if log.data.len() >= 32 {
        U256::from_be_slice(&log.data[0..32])
    } else {
        U256::ZERO
    };
    Ok((from, to, value))
}

/// Parse a 32-byte hex topic into an Address (last 20 bytes).
fn parse_address_from_topic(topic: &str) -> Result<Address> {
    let s = topic.strip_prefix("0x").unwrap_or(topic);
    let s = if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    };
    let bytes = hex::decode(&s).context("Invalid hex in topic")?;
    if bytes.len() < 20 {
        anyhow::bail!("Topic too short for address");
    }
    let start = bytes.len().saturating_sub(20);
    Ok(Address::from_slice(&bytes[start..]))
}

/// Fetch Transfer logs for the block, chunking the recipient topic list.
///
/// A chunk rejected as too broad is retried as individual single-address
/// queries; other chunk errors are counted and skipped. Chunking can make
/// result sets overlap, so callers must dedup.
async fn fetch_transfer_logs<C: ChainClient>(
    chain: &C,
    block_number: u64,
    wallet_list: &[Address],
    chunk_size: usize,
    governor: &RateGovernor,
    stats: &mut ScanStats,
) -> Vec<Log> {
    let mut logs = Vec::new();
    let chunk_size = chunk_size.max(1);

    for (i, chunk) in wallet_list.chunks(chunk_size).enumerate() {
        if i > 0 {
            governor.pause().await;
        }

        match chain.get_logs(&transfer_filter(block_number, chunk)).await {
            Ok(chunk_logs) => logs.extend(chunk_logs),
            Err(RpcError::LogQueryTooBroad(msg)) => {
                warn!(
                    "log query chunk of {} rejected as too broad ({}), splitting",
                    chunk.len(),
                    msg
                );
                for &addr in chunk {
                    governor.pause().await;
                    match chain
                        .get_logs(&transfer_filter(block_number, &[addr]))
                        .await
                    {
                        Ok(single_logs) => logs.extend(single_logs),
                        Err(e) => {
                            warn!("single-address log query failed for {:?}: {}", addr, e);
                            stats.errors += 1;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("log query chunk failed for block {}: {}", block_number, e);
                stats.errors += 1;
            }
        }
    }

    logs
}

/// Scan one block for token transfers to monitored wallets.
pub async fn scan_block_tokens<C, S>(
    chain: &C,
    writer: &LedgerWriter<S>,
    block: &Block,
    wallet_list: &[Address],
    wallets: &HashSet<Address>,
    receipts: &mut ReceiptCache,
    tokens: &mut TokenMetaCache,
    governor: &RateGovernor,
    config: &IndexerConfig,
    tip_height: u64,
) -> ScanStats
where
    C: ChainClient,
    S: LedgerStore,
{
    let mut stats = ScanStats::default();
    if wallet_list.is_empty() {
        return stats;
    }

    let logs = fetch_transfer_logs(
        chain,
        block.number,
        wallet_list,
        config.topic_chunk_size,
        governor,
        &mut stats,
    )
    .await;

    // Chunk overlap can duplicate logs; process each exactly once.
    let mut seen: HashSet<(B256, u64, Address)> = HashSet::new();

    for log in logs {
        let key = (
            log.transaction_hash,
            log.log_index.unwrap_or(0),
            log.address,
        );
        if !seen.insert(key) {
            continue;
        }
        if !is_transfer_log(&log) {
            continue;
        }

        let (from, to, value) = match decode_transfer_log(&log) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("failed to decode Transfer log in {:?}: {:#}", log.transaction_hash, e);
                continue;
            }
        };

        if value == U256::ZERO {
            continue;
        }
        // Some tokens emit no-op self transfers
        if from == to {
            debug!("skipping self-transfer in {:?}", log.transaction_hash);
            continue;
        }
        if !wallets.contains(&to) {
            continue;
        }

        let info = resolve_token_info(chain, tokens, log.address).await;

        let receipt = match fetch_receipt_cached(
            chain,
            receipts,
            &config.retry,
            log.transaction_hash,
        )
        .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(
                    "failed to fetch receipt for {:?}: {}",
                    log.transaction_hash, e
                );
                stats.errors += 1;
                None
            }
        };

        let receipt_info = receipt.as_ref().map(|receipt| ReceiptInfo {
            success: receipt.is_success(),
            gas_used: receipt.gas_used,
            gas_price: receipt.effective_gas_price.unwrap_or_default(),
        });

        let params = DepositParams {
            wallet: to,
            from,
            to,
            token: log.address,
            token_symbol: info.symbol,
            decimals: info.decimals,
            amount: value,
            tx_hash: log.transaction_hash,
            block_number: block.number,
            block_hash: block.hash,
            timestamp: block.timestamp,
            confirmations: tip_height.saturating_sub(block.number) + 1,
            receipt: receipt_info,
        };

        match writer.record_deposit(&params) {
            Ok(_) => stats.recorded += 1,
            Err(e) => {
                warn!(
                    "failed to record token deposit {:?}: {:#}",
                    log.transaction_hash, e
                );
                stats.errors += 1;
            }
        }
    }

    stats
}
