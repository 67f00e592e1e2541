//! LedgerStore trait and RocksDB implementation
//!
//! Persists transaction records with a uniqueness guarantee on the
//! composite identity (transaction hash, token address). The indexer is
//! the sole writer of deposit records; the transaction-history API and
//! statistics read this store directly.

use crate::keys::{decode_wallet_index_key, encode_record_key, encode_wallet_index_key, encode_wallet_prefix};
use crate::ledger::{TransactionRecord, TxStatus};
use alloy_primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use std::path::Path;

/// Fields applied when promoting a Pending record.
///
/// Identity and amount fields are deliberately absent: a promotion can
/// never alter what was deposited, only when and how firmly.
#[derive(Debug, Clone)]
pub struct StatusPromotion {
    /// New status (normally Confirmed)
    pub status: TxStatus,
    /// Block the transaction landed in
    pub block_number: u64,
    /// Hash of that block
    pub block_hash: B256,
    /// Confirmation count at promotion time
    pub confirmations: u64,
    /// Gas used, now that a receipt exists
    pub gas_used: U256,
    /// Effective gas price
    pub gas_price: U256,
    /// Wall-clock promotion time (Unix epoch seconds)
    pub confirmed_at: u64,
}

/// Trait defining the ledger persistence interface.
pub trait LedgerStore {
    /// Look up a record by its composite identity.
    fn find_by_identity(&self, tx_hash: B256, token: Address) -> Result<Option<TransactionRecord>>;

    /// Insert a new record.
    ///
    /// Fails if a record with the same identity already exists; callers
    /// are expected to look up first and treat an existing record as the
    /// result of the write.
    fn insert(&self, record: &TransactionRecord) -> Result<()>;

    /// Promote a Pending record's status and confirmation metadata.
    ///
    /// Returns the stored record (updated if it was Pending, unchanged
    /// otherwise), or `None` if no record exists under the identity.
    fn promote_status(
        &self,
        tx_hash: B256,
        token: Address,
        promotion: &StatusPromotion,
    ) -> Result<Option<TransactionRecord>>;

    /// All records filed under a wallet, in block order.
    fn records_for_wallet(&self, wallet: Address) -> Result<Vec<TransactionRecord>>;
}

/// RocksDB-backed implementation of LedgerStore.
///
/// Column families:
/// - records: identity key -> postcard-encoded TransactionRecord
/// - wallet_index: (wallet, block, identity) -> empty, for history scans
pub struct RocksLedgerStore {
    db: DB,
}

impl RocksLedgerStore {
    /// Open or create a RocksDB database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let column_families = vec![
            ColumnFamilyDescriptor::new("records", Options::default()),
            ColumnFamilyDescriptor::new("wallet_index", Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, column_families)
            .context("Failed to open RocksDB database")?;

        Ok(Self { db })
    }

    /// Get a column family handle by name.
    fn get_cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .with_context(|| format!("Column family '{}' not found", name))
    }

    fn load_record(&self, tx_hash: B256, token: Address) -> Result<Option<TransactionRecord>> {
        let cf = self.get_cf("records")?;
        let key = encode_record_key(tx_hash, token);
        match self.db.get_cf(cf, &key).context("Failed to get record")? {
            Some(bytes) => {
                let record =
                    postcard::from_bytes(&bytes).context("Failed to deserialize record")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn put_record(&self, record: &TransactionRecord) -> Result<()> {
        let cf = self.get_cf("records")?;
        let key = encode_record_key(record.tx_hash, record.token_address);
        let value = postcard::to_allocvec(record).context("Failed to serialize record")?;
        self.db
            .put_cf(cf, &key, &value)
            .context("Failed to put record")?;
        Ok(())
    }
}

impl LedgerStore for RocksLedgerStore {
    fn find_by_identity(&self, tx_hash: B256, token: Address) -> Result<Option<TransactionRecord>> {
        self.load_record(tx_hash, token)
    }

    fn insert(&self, record: &TransactionRecord) -> Result<()> {
        if self.load_record(record.tx_hash, record.token_address)?.is_some() {
            anyhow::bail!(
                "Record already exists for tx {:?} token {:?}",
                record.tx_hash,
                record.token_address
            );
        }

        self.put_record(record)?;

        let cf = self.get_cf("wallet_index")?;
        let key = encode_wallet_index_key(
            record.wallet_address,
            record.block_number,
            record.tx_hash,
            record.token_address,
        );
        self.db
            .put_cf(cf, &key, b"")
            .context("Failed to put wallet index entry")?;
        Ok(())
    }

    fn promote_status(
        &self,
        tx_hash: B256,
        token: Address,
        promotion: &StatusPromotion,
    ) -> Result<Option<TransactionRecord>> {
        let mut record = match self.load_record(tx_hash, token)? {
            Some(record) => record,
            None => return Ok(None),
        };

        if record.status != TxStatus::Pending {
            return Ok(Some(record));
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

        self.put_record(&record)?;
        Ok(Some(record))
    }

    fn records_for_wallet(&self, wallet: Address) -> Result<Vec<TransactionRecord>> {
        let cf = self.get_cf("wallet_index")?;
        let prefix = encode_wallet_prefix(wallet);

        let mut records = Vec::new();
        let iter = self.db.iterator_cf(
            cf,
            rocksdb::IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        for item in iter {
            let (key, _) = item.context("Failed to read iterator")?;
            if !key.starts_with(&prefix) {
                break;
            }

            let (_, _, tx_hash, token) =
                decode_wallet_index_key(&key).context("Failed to decode wallet index key")?;

            // An index entry without its record would mean a partial write;
            // surface it rather than silently skipping.
            let record = self
                .load_record(tx_hash, token)?
                .with_context(|| format!("Wallet index points at missing record {:?}", tx_hash))?;
            records.push(record);
        }

        Ok(records)
    }
}
