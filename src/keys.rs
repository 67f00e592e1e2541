//! Key encoding and decoding utilities
//!
//! All keys use a single-byte prefix followed by binary data.
//! This ensures deterministic, lexicographically ordered keys in RocksDB.
//! Record identity is the composite (transaction hash, token address),
//! encoded directly into the key so uniqueness holds at the storage layer.

use alloy_primitives::{Address, B256};
use anyhow::Result;

/// Encode a ledger record key.
///
/// Format: byte 'R' (0x52) + tx_hash (32 bytes) + token_address (20 bytes)
/// Total length: 53 bytes
pub fn encode_record_key(tx_hash: B256, token: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(53);
    key.push(b'R');
    key.extend_from_slice(tx_hash.as_slice());
    key.extend_from_slice(token.as_slice());
    key
}

/// Decode a ledger record key back into (tx_hash, token_address).
pub fn decode_record_key(key: &[u8]) -> Result<(B256, Address)> {
    if key.len() != 53 || key[0] != b'R' {
        anyhow::bail!("Invalid record key (expected 53 bytes with 'R' prefix)");
    }
    let tx_hash = B256::from_slice(&key[1..33]);
    let token = Address::from_slice(&key[33..53]);
    Ok((tx_hash, token))
}

/// Encode a wallet history index key.
///
/// Format: byte 'W' (0x57) + wallet (20 bytes) + block_number (8 bytes,
/// big-endian) + tx_hash (32 bytes) + token_address (20 bytes)
/// Total length: 81 bytes
///
/// Big-endian block numbers make a prefix scan over one wallet yield its
/// records in block order.
pub fn encode_wallet_index_key(
    wallet: Address,
    block: u64,
    tx_hash: B256,
    token: Address,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(81);
    key.push(b'W');
    key.extend_from_slice(wallet.as_slice());
    key.extend_from_slice(&block.to_be_bytes());
    key.extend_from_slice(tx_hash.as_slice());
    key.extend_from_slice(token.as_slice());
    key
}

/// Decode a wallet history index key.
pub fn decode_wallet_index_key(key: &[u8]) -> Result<(Address, u64, B256, Address)> {
    if key.len() != 81 || key[0] != b'W' {
        anyhow::bail!("Invalid wallet index key (expected 81 bytes with 'W' prefix)");
    }
    let wallet = Address::from_slice(&key[1..21]);
    let block = u64::from_be_bytes(key[21..29].try_into().expect("8 bytes for u64"));
    let tx_hash = B256::from_slice(&key[29..61]);
    let token = Address::from_slice(&key[61..81]);
    Ok((wallet, block, tx_hash, token))
}

/// Prefix covering every index entry of one wallet.
pub fn encode_wallet_prefix(wallet: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(21);
    key.push(b'W');
    key.extend_from_slice(wallet.as_slice());
    key
}
