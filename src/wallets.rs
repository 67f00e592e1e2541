//! Wallet directory
//!
//! The set of user wallet addresses the indexer monitors. The directory
//! is an external collaborator (the platform's user store); it is
//! re-read once per processing tick so newly registered wallets start
//! being watched without a restart.

use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Source of the current set of monitored wallet addresses.
pub trait WalletDirectory {
    /// List all wallet addresses to monitor. Called once per tick.
    fn list_wallet_addresses(&self) -> Result<Vec<Address>>;
}

/// File-backed wallet directory.
///
/// One address per line, with or without 0x prefix. Empty lines and
/// lines starting with '#' are ignored. The file is re-read on every
/// call, so edits take effect on the next tick.
pub struct FileWalletDirectory {
    path: PathBuf,
}

impl FileWalletDirectory {
    /// Create a directory backed by the given file.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl WalletDirectory for FileWalletDirectory {
    fn list_wallet_addresses(&self) -> Result<Vec<Address>> {
        load_wallet_file(&self.path)
    }
}

/// Per-tick snapshot of the monitored set.
///
/// Addresses are held as `Address` values, which compare byte-wise; the
/// lowercase normalization the ledger requires happens at the hex
/// parsing and display boundaries.
pub fn snapshot(addresses: &[Address]) -> HashSet<Address> {
    addresses.iter().copied().collect()
}

/// Load wallet addresses from a file.
pub fn load_wallet_file(path: &Path) -> Result<Vec<Address>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read wallet file: {:?}", path))?;

    let mut addresses = Vec::new();
    for (line_num, line) in contents.lines().enumerate() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let addr = parse_address(line)
            .with_context(|| format!("Invalid address on line {}: {}", line_num + 1, line))?;

        addresses.push(addr);
    }

    Ok(addresses)
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

/// Parse an address from a hex string.
///
/// Accepts addresses with or without 0x prefix, any letter case.
pub fn parse_address(s: &str) -> Result<Address> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).with_context(|| format!("Invalid hex address: {}", s))?;

    if bytes.len() != 20 {
        anyhow::bail!(
            "Address must be 20 bytes (40 hex chars), got {} bytes",
            bytes.len()
        );
    }

    Ok(Address::from_slice(&bytes))
}
