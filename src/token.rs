//! Token metadata resolution
//!
//! Resolves an ERC-20 contract's symbol and decimals via `eth_call`.
//! Both calls are best-effort: a contract with missing or non-standard
//! metadata resolves to a fallback (abbreviated address, 18 decimals)
//! rather than blocking the deposit record.

use crate::cache::TokenMetaCache;
use crate::rpc::ChainClient;
use alloy_primitives::Address;
use tracing::warn;

/// Function selector for `symbol()`.
const SYMBOL_SELECTOR: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41];
/// Function selector for `decimals()`.
const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

/// Resolved token metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// Token symbol, or an abbreviated contract address as fallback
    pub symbol: String,
    /// Token decimals, 18 as fallback
    pub decimals: u8,
}

/// Resolve a token's symbol and decimals, consulting the cache first.
pub async fn resolve_token_info<C: ChainClient>(
    chain: &C,
    cache: &mut TokenMetaCache,
    token: Address,
) -> TokenInfo {
    if let Some(info) = cache.get(token) {
        return info.clone();
    }

    let symbol = match chain.call(token, SYMBOL_SELECTOR.to_vec()).await {
        Ok(output) => decode_symbol(&output).unwrap_or_else(|| fallback_symbol(token)),
        Err(e) => {
            warn!("symbol() call failed for token {:?}: {}", token, e);
            fallback_symbol(token)
        }
    };

    let decimals = match chain.call(token, DECIMALS_SELECTOR.to_vec()).await {
        Ok(output) => decode_decimals(&output).unwrap_or(18),
        Err(e) => {
            warn!("decimals() call failed for token {:?}: {}", token, e);
            18
        }
    };

    let info = TokenInfo { symbol, decimals };
    cache.put(token, info.clone());
    info
}

/// Abbreviated contract address used when the symbol is unreadable.
fn fallback_symbol(token: Address) -> String {
    let full = format!("{:x}", token);
    format!("0x{}..{}", &full[..4], &full[full.len() - 4..])
}

/// Decode the return value of `decimals()`.
///
/// The value is a uint8 right-aligned in a 32-byte word; anything above
/// 77 cannot be a real precision and is rejected.
fn decode_decimals(output: &[u8]) -> Option<u8> {
    if output.len() < 32 {
        return None;
    }
    // Reject values with any higher-order bytes set
    if output[..31].iter().any(|&b| b != 0) {
        return None;
    }
    let decimals = output[31];
    if decimals > 77 {
        return None;
    }
    Some(decimals)
}

/// Decode the return value of `symbol()`.
///
/// Standard tokens return an ABI-encoded dynamic string; a few old
/// contracts return a fixed bytes32 instead. Both are handled.
fn decode_symbol(output: &[u8]) -> Option<String> {
    if output.is_empty() {
        return None;
    }

    // Dynamic string: word 0 = offset, then length word, then data
    if output.len() >= 64 {
        let offset = word_as_usize(&output[0..32])?;
        if offset + 32 <= output.len() {
            if let Some(len) = word_as_usize(&output[offset..offset + 32]) {
                let start = offset + 32;
                if len > 0 && len <= 64 && start + len <= output.len() {
                    let s = String::from_utf8_lossy(&output[start..start + len]);
                    let trimmed = s.trim_matches(char::from(0)).trim();
                    if !trimmed.is_empty() {
                        return Some(trimmed.to_string());
                    }
                }
            }
        }
    }

    // bytes32 fallback: utf8 text padded with trailing zeros
    if output.len() >= 32 {
        let s = String::from_utf8_lossy(&output[0..32]);
        let trimmed = s.trim_matches(char::from(0)).trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_graphic()) {
            return Some(trimmed.to_string());
        }
    }

    None
}

/// Interpret a 32-byte big-endian word as usize, rejecting huge values.
fn word_as_usize(word: &[u8]) -> Option<usize> {
    if word.len() != 32 || word[..24].iter().any(|&b| b != 0) {
        return None;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..32]);
    let value = u64::from_be_bytes(buf);
    if value > 4096 {
        return None;
    }
    Some(value as usize)
}
