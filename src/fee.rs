//! Gas fee calculation utilities
//!
//! Derives the effective gas price and total fee recorded on a deposit,
//! for both legacy and EIP-1559 transactions.

use crate::types::{Block, Receipt, Transaction};
use alloy_primitives::U256;
use anyhow::{Context, Result};

/// Calculate the effective gas price for a transaction.
///
/// Priority order:
/// 1. `effective_gas_price` from the receipt if available (post-London)
/// 2. `gas_price` for legacy transactions
/// 3. EIP-1559: `min(max_fee, base_fee + max_priority_fee)`
pub fn effective_gas_price(tx: &Transaction, receipt: &Receipt, block: &Block) -> Result<U256> {
    if let Some(egp) = receipt.effective_gas_price {
        return Ok(egp);
    }

    if tx.is_legacy() {
        return tx.gas_price.context("Legacy transaction missing gas_price");
    }

    if tx.is_eip1559() {
        let base_fee = block
            .base_fee_per_gas
            .context("EIP-1559 transaction but block missing base_fee_per_gas")?;
        let max_fee = tx
            .max_fee_per_gas
            .context("EIP-1559 transaction missing max_fee_per_gas")?;
        let max_priority_fee = tx.max_priority_fee_per_gas.unwrap_or(U256::ZERO);

        let calculated = base_fee.saturating_add(max_priority_fee);
        return Ok(calculated.min(max_fee));
    }

    anyhow::bail!("Transaction type not recognized (neither legacy nor EIP-1559)");
}

/// Total fee paid: gas_used * effective_gas_price.
pub fn total_fee(gas_used: U256, gas_price: U256) -> U256 {
    gas_used.saturating_mul(gas_price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    fn test_block(base_fee: Option<U256>) -> Block {
        Block {
            number: 12345,
            hash: b256!("00000000000000000000000000000000000000000000000000000000000000aa"),
            timestamp: 1_700_000_000,
            base_fee_per_gas: base_fee,
            transactions: vec![],
        }
    }

    fn test_tx(
        gas_price: Option<U256>,
        max_fee: Option<U256>,
        max_priority_fee: Option<U256>,
    ) -> Transaction {
        Transaction {
            hash: b256!("00000000000000000000000000000000000000000000000000000000000000b1"),
            from: address!("0000000000000000000000000000000000000001"),
            to: Some(address!("0000000000000000000000000000000000000002")),
            value: U256::ZERO,
            gas_price,
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: max_priority_fee,
        }
    }

    fn test_receipt(effective_gas_price: Option<U256>) -> Receipt {
        Receipt {
            status: 1,
            gas_used: U256::from(21000u64),
            effective_gas_price,
            block_number: Some(12345),
            block_hash: None,
            logs: vec![],
        }
    }

    #[test]
    fn test_receipt_price_takes_priority() {
        let block = test_block(Some(U256::from(10_000_000_000u64)));
        let tx = test_tx(None, Some(U256::from(30_000_000_000u64)), None);
        let receipt = test_receipt(Some(U256::from(15_000_000_000u64)));

        let price = effective_gas_price(&tx, &receipt, &block).unwrap();
        assert_eq!(price, U256::from(15_000_000_000u64));
    }

    #[test]
    fn test_legacy_price() {
        let block = test_block(None);
        let tx = test_tx(Some(U256::from(20_000_000_000u64)), None, None);
        let receipt = test_receipt(None);

        let price = effective_gas_price(&tx, &receipt, &block).unwrap();
        assert_eq!(price, U256::from(20_000_000_000u64));
        assert_eq!(
            total_fee(receipt.gas_used, price),
            U256::from(420_000_000_000_000u64)
        );
    }

    #[test]
    fn test_eip1559_price_capped_by_max_fee() {
        let block = test_block(Some(U256::from(50_000_000_000u64)));
        let tx = test_tx(
            None,
            Some(U256::from(30_000_000_000u64)),
            Some(U256::from(2_000_000_000u64)),
        );
        let receipt = test_receipt(None);

        // min(30, 50 + 2) = 30 gwei
        let price = effective_gas_price(&tx, &receipt, &block).unwrap();
        assert_eq!(price, U256::from(30_000_000_000u64));
    }

    #[test]
    fn test_eip1559_price_base_plus_tip() {
        let block = test_block(Some(U256::from(10_000_000_000u64)));
        let tx = test_tx(
            None,
            Some(U256::from(30_000_000_000u64)),
            Some(U256::from(2_000_000_000u64)),
        );
        let receipt = test_receipt(None);

        // min(30, 10 + 2) = 12 gwei
        let price = effective_gas_price(&tx, &receipt, &block).unwrap();
        assert_eq!(price, U256::from(12_000_000_000u64));
    }
}
