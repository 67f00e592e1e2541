//! Shared test doubles
//!
//! A scriptable in-memory chain client and ledger store used by the
//! scanner and indexer tests. Failure injection mirrors the error kinds
//! the production client can produce.

use crate::erc20::wallet_topic;
use crate::ledger::TransactionRecord;
use crate::rpc::{ChainClient, RpcError};
use crate::store::{LedgerStore, StatusPromotion};
use crate::types::{Block, Log, LogFilter, Receipt, Transaction};
use alloy_primitives::{address, Address, B256, U256};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Transfer event signature hex, duplicated here to build mock logs.
const TRANSFER_TOPIC_HEX: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// A fixed wallet address used across tests.
pub fn test_wallet() -> Address {
    address!("0742d35cc6634c0532925a3b844bc9e7595f0beb")
}

/// Deterministic block hash for a block number.
pub fn block_hash_for(number: u64) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[24..32].copy_from_slice(&number.to_be_bytes());
    B256::from(bytes)
}

/// Build a block in the mock chain's shape.
pub fn test_block(number: u64, transactions: Vec<B256>) -> Block {
    Block {
        number,
        hash: block_hash_for(number),
        timestamp: 1_700_000_000 + number,
        base_fee_per_gas: Some(U256::from(1_000_000_000u64)),
        transactions,
    }
}

#[derive(Default)]
struct MockChainInner {
    height: u64,
    /// block number -> transaction hashes
    block_txs: HashMap<u64, Vec<B256>>,
    transactions: HashMap<B256, Transaction>,
    receipts: HashMap<B256, Receipt>,
    /// block number -> Transfer logs
    logs: HashMap<u64, Vec<Log>>,
    token_meta: HashMap<Address, (String, u8)>,
    failing_transactions: HashSet<B256>,
    failing_blocks: HashSet<u64>,
    reject_multi_topic: bool,
    ignore_recipient_filter: bool,
    next_hash: u64,
    next_log_index: u64,
}

/// Scriptable in-memory chain client.
pub struct MockChain {
    inner: Mutex<MockChainInner>,
    log_queries: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockChainInner::default()),
            log_queries: AtomicUsize::new(0),
        }
    }

    pub fn set_height(&self, height: u64) {
        self.inner.lock().unwrap().height = height;
    }

    /// Number of getLogs calls issued so far.
    pub fn log_queries(&self) -> usize {
        self.log_queries.load(Ordering::SeqCst)
    }

    pub fn block_tx_hashes(&self, number: u64) -> Vec<B256> {
        self.inner
            .lock()
            .unwrap()
            .block_txs
            .get(&number)
            .cloned()
            .unwrap_or_default()
    }

    fn fresh_hash(inner: &mut MockChainInner) -> B256 {
        inner.next_hash += 1;
        let mut bytes = [0u8; 32];
        bytes[0] = tx_marker();
        bytes[24..32].copy_from_slice(&inner.next_hash.to_be_bytes());
        B256::from(bytes)
    }

    /// Add a native value transfer to a block. Creates the transaction
    /// and a successful receipt; bumps the chain height if needed.
    pub fn add_native_transfer(
        &self,
        block: u64,
        from: Address,
        to: Address,
        value: U256,
    ) -> B256 {
        let mut inner = self.inner.lock().unwrap();
        let hash = Self::fresh_hash(&mut inner);
        inner.transactions.insert(
            hash,
            Transaction {
                hash,
                from,
                to: Some(to),
                value,
                gas_price: Some(U256::from(20_000_000_000u64)),
                max_fee_per_gas: None,
                max_priority_fee_per_gas: None,
            },
        );
        inner.receipts.insert(
            hash,
            Receipt {
                status: 1,
                gas_used: U256::from(21000u64),
                effective_gas_price: Some(U256::from(20_000_000_000u64)),
                block_number: Some(block),
                block_hash: Some(block_hash_for(block)),
                logs: vec![],
            },
        );
        inner.block_txs.entry(block).or_default().push(hash);
        inner.height = inner.height.max(block);
        hash
    }

    /// Add a token Transfer log to a block, with a successful receipt.
    pub fn add_token_transfer(
        &self,
        block: u64,
        token: Address,
        from: Address,
        to: Address,
        value: U256,
    ) -> B256 {
        let mut inner = self.inner.lock().unwrap();
        let hash = Self::fresh_hash(&mut inner);
        inner.next_log_index += 1;
        let mut data = vec![0u8; 32];
        data.copy_from_slice(&value.to_be_bytes::<32>());
        let log = Log {
            address: token,
            topics: vec![
                TRANSFER_TOPIC_HEX.to_string(),
                wallet_topic(from),
                wallet_topic(to),
            ],
            data,
            transaction_hash: hash,
            log_index: Some(inner.next_log_index),
            block_number: Some(block),
        };
        inner.receipts.insert(
            hash,
            Receipt {
                status: 1,
                gas_used: U256::from(65000u64),
                effective_gas_price: Some(U256::from(20_000_000_000u64)),
                block_number: Some(block),
                block_hash: Some(block_hash_for(block)),
                logs: vec![log.clone()],
            },
        );
        inner.logs.entry(block).or_default().push(log);
        inner.height = inner.height.max(block);
        hash
    }

    /// Register a token's symbol and decimals for eth_call.
    pub fn set_token_meta(&self, token: Address, symbol: &str, decimals: u8) {
        self.inner
            .lock()
            .unwrap()
            .token_meta
            .insert(token, (symbol.to_string(), decimals));
    }

    /// Make getTransactionReceipt return None for this hash.
    pub fn drop_receipt(&self, hash: B256) {
        self.inner.lock().unwrap().receipts.remove(&hash);
    }

    /// Make getTransaction fail with a fatal error for this hash.
    pub fn fail_transaction(&self, hash: B256) {
        self.inner.lock().unwrap().failing_transactions.insert(hash);
    }

    /// Make getBlock fail with a fatal error for this block.
    pub fn fail_block(&self, number: u64) {
        self.inner.lock().unwrap().failing_blocks.insert(number);
    }

    /// Reject getLogs queries with more than one recipient topic, the
    /// way providers with small filter limits do.
    pub fn reject_multi_topic_queries(&self) {
        self.inner.lock().unwrap().reject_multi_topic = true;
    }

    /// Return every log of the block on every query, regardless of the
    /// recipient filter. Simulates chunk overlap and over-broad results.
    pub fn return_all_logs_regardless_of_filter(&self) {
        self.inner.lock().unwrap().ignore_recipient_filter = true;
    }

    /// Alias expressing the chunk-overlap scenario.
    pub fn duplicate_logs_across_chunks(&self) {
        self.return_all_logs_regardless_of_filter();
    }
}

/// Marker byte distinguishing mock transaction hashes from block hashes.
const fn tx_marker() -> u8 {
    0xf1
}

impl ChainClient for MockChain {
    async fn get_block_number(&self) -> Result<u64, RpcError> {
        Ok(self.inner.lock().unwrap().height)
    }

    async fn get_block(&self, number: u64, _include_bodies: bool) -> Result<Block, RpcError> {
        let inner = self.inner.lock().unwrap();
        if inner.failing_blocks.contains(&number) {
            return Err(RpcError::Other("injected block failure".to_string()));
        }
        if number > inner.height {
            return Err(RpcError::BadResponse(format!(
                "node returned null for block {}",
                number
            )));
        }
        let txs = inner.block_txs.get(&number).cloned().unwrap_or_default();
        Ok(test_block(number, txs))
    }

    async fn get_transaction(&self, hash: B256) -> Result<Option<Transaction>, RpcError> {
        let inner = self.inner.lock().unwrap();
        if inner.failing_transactions.contains(&hash) {
            return Err(RpcError::Other("injected transaction failure".to_string()));
        }
        Ok(inner.transactions.get(&hash).cloned())
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<Receipt>, RpcError> {
        Ok(self.inner.lock().unwrap().receipts.get(&hash).cloned())
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, RpcError> {
        self.log_queries.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock().unwrap();

        let recipient_topics: Vec<String> = filter
            .topics
            .get(2)
            .and_then(|t| t.clone())
            .unwrap_or_default();

        if inner.reject_multi_topic && recipient_topics.len() > 1 {
            return Err(RpcError::LogQueryTooBroad("limit exceeded".to_string()));
        }

        let mut out = Vec::new();
        for block in filter.from_block..=filter.to_block {
            if let Some(logs) = inner.logs.get(&block) {
                for log in logs {
                    if inner.ignore_recipient_filter {
                        out.push(log.clone());
                        continue;
                    }
                    let to_topic = log.topics.get(2);
                    if to_topic.map_or(false, |t| recipient_topics.contains(t)) {
                        out.push(log.clone());
                    }
                }
            }
        }
        Ok(out)
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        let inner = self.inner.lock().unwrap();
        let Some((symbol, decimals)) = inner.token_meta.get(&to) else {
            return Err(RpcError::Rpc("execution reverted".to_string()));
        };
        match data.as_slice() {
            // symbol()
            [0x95, 0xd8, 0x9b, 0x41] => {
                let mut out = vec![0u8; 32];
                out[31] = 32;
                let mut len_word = vec![0u8; 32];
                len_word[31] = symbol.len() as u8;
                out.extend_from_slice(&len_word);
                let mut bytes = symbol.as_bytes().to_vec();
                while bytes.len() % 32 != 0 {
                    bytes.push(0);
                }
                out.extend_from_slice(&bytes);
                Ok(out)
            }
            // decimals()
            [0x31, 0x3c, 0xe5, 0x67] => {
                let mut out = vec![0u8; 32];
                out[31] = *decimals;
                Ok(out)
            }
            _ => Err(RpcError::Rpc("unknown selector".to_string())),
        }
    }
}

/// In-memory LedgerStore with the same semantics as the RocksDB one.
pub struct MemoryLedger {
    records: Mutex<HashMap<(B256, Address), TransactionRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn get(&self, tx_hash: B256, token: Address) -> Option<TransactionRecord> {
        self.records.lock().unwrap().get(&(tx_hash, token)).cloned()
    }
}

impl LedgerStore for MemoryLedger {
    fn find_by_identity(&self, tx_hash: B256, token: Address) -> Result<Option<TransactionRecord>> {
        Ok(self.get(tx_hash, token))
    }

    fn insert(&self, record: &TransactionRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let key = (record.tx_hash, record.token_address);
        if records.contains_key(&key) {
            anyhow::bail!("Record already exists for {:?}", key);
        }
        records.insert(key, record.clone());
        Ok(())
    }

    fn promote_status(
        &self,
        tx_hash: B256,
        token: Address,
        promotion: &StatusPromotion,
    ) -> Result<Option<TransactionRecord>> {
        use crate::ledger::TxStatus;
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.get_mut(&(tx_hash, token)) else {
            return Ok(None);
        };
        if record.status != TxStatus::Pending {
            return Ok(Some(record.clone()));
        }
        record.status = promotion.status;
        record.block_number = promotion.block_number;
        record.block_hash = promotion.block_hash;
        record.confirmations = promotion.confirmations;
        record.gas_used = promotion.gas_used;
        record.gas_price = promotion.gas_price;
        record.gas_fee = promotion.gas_used.saturating_mul(promotion.gas_price);
        if promotion.status == TxStatus::Confirmed {
            record.confirmed_at = Some(promotion.confirmed_at);
        }
        Ok(Some(record.clone()))
    }

    fn records_for_wallet(&self, wallet: Address) -> Result<Vec<TransactionRecord>> {
        let records = self.records.lock().unwrap();
        let mut out: Vec<TransactionRecord> = records
            .values()
            .filter(|r| r.wallet_address == wallet)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.block_number);
        Ok(out)
    }
}
