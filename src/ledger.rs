//! Ledger record types and the deposit writer
//!
//! A `TransactionRecord` is the persisted unit of truth for any observed
//! on-chain movement relevant to a user wallet. Record identity is the
//! composite (transaction hash, token address); the writer is idempotent
//! over that identity, which makes overlapping or repeated scans safe.

use crate::fee;
use crate::store::{LedgerStore, StatusPromotion};
use alloy_primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Sentinel token address denoting the chain's native unit.
pub const NATIVE_TOKEN: Address = Address::ZERO;

/// Classification of a ledger record.
///
/// The indexer only ever writes `Deposit`; the other variants belong to
/// the rest of the platform, which shares this store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Deposit,
    Withdrawal,
    Swap,
    Transfer,
    Approval,
    Other,
}

/// Lifecycle status of a ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Persisted record of an observed on-chain movement.
///
/// Identity fields (`tx_hash`, `token_address`) and the amount are
/// written once and never modified; only status and confirmation
/// metadata may be promoted afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction hash (identity, with `token_address`)
    pub tx_hash: B256,
    /// Record classification
    pub record_type: RecordType,
    /// Chain tag this record was observed on
    pub chain: String,
    /// Transfer sender
    pub from: Address,
    /// Transfer recipient
    pub to: Address,
    /// The monitored wallet this record is filed under
    pub wallet_address: Address,
    /// Token contract, or [`NATIVE_TOKEN`] for the native unit
    pub token_address: Address,
    /// Token symbol at observation time
    pub token_symbol: String,
    /// Raw amount in the token's smallest unit
    pub amount: U256,
    /// Human-readable decimal amount
    pub amount_formatted: String,
    /// Block the transaction was included in
    pub block_number: u64,
    /// Hash of that block
    pub block_hash: B256,
    /// Block timestamp (Unix epoch seconds)
    pub timestamp: u64,
    /// Gas used by the transaction
    pub gas_used: U256,
    /// Effective gas price paid
    pub gas_price: U256,
    /// Total fee: gas_used * gas_price
    pub gas_fee: U256,
    /// Lifecycle status
    pub status: TxStatus,
    /// Confirmation count at last observation
    pub confirmations: u64,
    /// Wall-clock time the record was confirmed (Unix epoch seconds)
    pub confirmed_at: Option<u64>,
}

/// Gas and outcome data taken from a receipt.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptInfo {
    /// Whether the transaction succeeded
    pub success: bool,
    /// Gas used
    pub gas_used: U256,
    /// Effective gas price
    pub gas_price: U256,
}

/// Everything the writer needs to file one detected deposit.
#[derive(Debug, Clone)]
pub struct DepositParams {
    /// The monitored wallet that received the transfer
    pub wallet: Address,
    /// Transfer sender
    pub from: Address,
    /// Transfer recipient
    pub to: Address,
    /// Token contract, or [`NATIVE_TOKEN`]
    pub token: Address,
    /// Resolved token symbol
    pub token_symbol: String,
    /// Resolved token decimals (used only for display formatting)
    pub decimals: u8,
    /// Raw amount in smallest unit
    pub amount: U256,
    /// Transaction hash
    pub tx_hash: B256,
    /// Block number
    pub block_number: u64,
    /// Block hash
    pub block_hash: B256,
    /// Block timestamp
    pub timestamp: u64,
    /// Confirmations observed at scan time
    pub confirmations: u64,
    /// Receipt data, if a receipt was obtainable
    pub receipt: Option<ReceiptInfo>,
}

/// Idempotent writer of deposit records.
pub struct LedgerWriter<S> {
    store: S,
    chain: String,
}

impl<S: LedgerStore> LedgerWriter<S> {
    /// Create a writer over the given store.
    pub fn new(store: S, chain: String) -> Self {
        Self { store, chain }
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// File a detected deposit.
    ///
    /// Looks up the identity key first. An existing record is returned
    /// unchanged, except that a Pending record is promoted in place when
    /// this observation carries a successful receipt. A new record is
    /// inserted Confirmed when a successful receipt is present, Failed
    /// on a reverted receipt, Pending when no receipt was obtainable.
    pub fn record_deposit(&self, params: &DepositParams) -> Result<TransactionRecord> {
        if let Some(existing) = self
            .store
            .find_by_identity(params.tx_hash, params.token)
            .context("Failed to look up ledger record")?
        {
            if existing.status == TxStatus::Pending {
                if let Some(receipt) = &params.receipt {
                    if receipt.success {
                        let promotion = StatusPromotion {
                            status: TxStatus::Confirmed,
                            block_number: params.block_number,
                            block_hash: params.block_hash,
                            confirmations: params.confirmations,
                            gas_used: receipt.gas_used,
                            gas_price: receipt.gas_price,
                            confirmed_at: now_unix(),
                        };
                        if let Some(promoted) = self
                            .store
                            .promote_status(params.tx_hash, params.token, &promotion)
                            .context("Failed to promote ledger record")?
                        {
                            info!(
                                "Promoted deposit {:?} (token {:?}) to confirmed",
                                params.tx_hash, params.token
                            );
                            return Ok(promoted);
                        }
                    }
                }
            }
            return Ok(existing);
        }

        let (status, gas_used, gas_price) = match &params.receipt {
            Some(r) if r.success => (TxStatus::Confirmed, r.gas_used, r.gas_price),
            Some(r) => (TxStatus::Failed, r.gas_used, r.gas_price),
            None => (TxStatus::Pending, U256::ZERO, U256::ZERO),
        };

        let record = TransactionRecord {
            tx_hash: params.tx_hash,
            record_type: RecordType::Deposit,
            chain: self.chain.clone(),
            from: params.from,
            to: params.to,
            wallet_address: params.wallet,
            token_address: params.token,
            token_symbol: params.token_symbol.clone(),
            amount: params.amount,
            amount_formatted: format_units(params.amount, params.decimals),
            block_number: params.block_number,
            block_hash: params.block_hash,
            timestamp: params.timestamp,
            gas_used,
            gas_price,
            gas_fee: fee::total_fee(gas_used, gas_price),
            status,
            confirmations: params.confirmations,
            confirmed_at: (status == TxStatus::Confirmed).then(now_unix),
        };

        self.store
            .insert(&record)
            .context("Failed to insert ledger record")?;

        info!(
            "Recorded deposit of {} {} to {:?} in block {} ({:?})",
            record.amount_formatted, record.token_symbol, record.wallet_address,
            record.block_number, record.status
        );

        Ok(record)
    }
}

/// Format a raw amount at the given decimal precision.
///
/// Always carries a fractional part: one whole unit at 18 decimals
/// formats as "1.0", not "1".
pub fn format_units(amount: U256, decimals: u8) -> String {
    if decimals == 0 {
        return format!("{}.0", amount);
    }

    let base = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / base;
    let frac = amount % base;

    let mut frac_str = frac.to_string();
    while frac_str.len() < decimals as usize {
        frac_str.insert(0, '0');
    }
    while frac_str.len() > 1 && frac_str.ends_with('0') {
        frac_str.pop();
    }

    format!("{}.{}", whole, frac_str)
}

/// Current wall-clock time as Unix epoch seconds.
fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
