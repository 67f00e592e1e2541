//! Per-scan caches
//!
//! In-memory caches that cut redundant RPC calls while a block is being
//! scanned: receipts are fetched at most once per transaction hash, and
//! token metadata at most once per contract.
//!
//! The receipt cache is scoped to a single block's scan; the token cache
//! lives for the indexer's lifetime (symbol and decimals don't change).

use crate::token::TokenInfo;
use crate::types::Receipt;
use alloy_primitives::{Address, B256};
use std::collections::HashMap;

/// Receipts fetched during one block's scan.
///
/// Only successful fetches are cached; a failed fetch stays absent so a
/// later pass over the same hash can try again.
pub struct ReceiptCache {
    receipts: HashMap<B256, Receipt>,
}

impl ReceiptCache {
    /// Create an empty cache for a fresh block scan.
    pub fn new() -> Self {
        Self {
            receipts: HashMap::new(),
        }
    }

    /// Look up a cached receipt.
    pub fn get(&self, tx_hash: B256) -> Option<&Receipt> {
        self.receipts.get(&tx_hash)
    }

    /// Cache a fetched receipt.
    pub fn put(&mut self, tx_hash: B256, receipt: Receipt) {
        self.receipts.insert(tx_hash, receipt);
    }
}

impl Default for ReceiptCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Token metadata cache.
///
/// Resolutions are cached forever, including fallback resolutions for
/// contracts whose metadata calls failed; those would fail the same way
/// on every log they emit.
pub struct TokenMetaCache {
    tokens: HashMap<Address, TokenInfo>,
}

impl TokenMetaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            tokens: HashMap::new(),
        }
    }

    /// Look up cached metadata for a token contract.
    pub fn get(&self, token: Address) -> Option<&TokenInfo> {
        self.tokens.get(&token)
    }

    /// Cache resolved metadata.
    pub fn put(&mut self, token: Address, info: TokenInfo) {
        self.tokens.insert(token, info);
    }
}

impl Default for TokenMetaCache {
    fn default() -> Self {
        Self::new()
    }
}
