//! Indexer configuration
//!
//! Tuning knobs for the deposit indexer. Defaults match a public RPC
//! provider with conservative filter limits; everything is overridable
//! from the `indexer` binary's flags and environment variables.

use crate::retry::RetryPolicy;
use std::time::Duration;

/// Configuration for one indexer instance.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Chain tag stamped on every record
    pub chain: String,
    /// First block to scan; `None` starts at the chain height observed
    /// at startup (deposits before that are not retroactively indexed)
    pub start_block: Option<u64>,
    /// Interval between processing ticks
    pub tick_interval: Duration,
    /// Cap on blocks pulled per tick; the primary backpressure control
    pub max_blocks_per_tick: u64,
    /// Recipient topics per getLogs query
    pub topic_chunk_size: usize,
    /// Rate governor floor
    pub min_delay: Duration,
    /// Rate governor cap
    pub max_delay: Duration,
    /// Retry budget for individual chain reads
    pub retry: RetryPolicy,
    /// Confirmation depth reported on records. Informational: records
    /// are confirmed as soon as a successful receipt exists, regardless
    /// of this threshold.
    pub confirmation_blocks: u64,
    /// Symbol of the chain's native unit
    pub native_symbol: String,
    /// Decimal precision of the native unit
    pub native_decimals: u8,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chain: "ethereum".to_string(),
            start_block: None,
            tick_interval: Duration::from_secs(20),
            max_blocks_per_tick: 3,
            topic_chunk_size: 4,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            confirmation_blocks: 12,
            native_symbol: "ETH".to_string(),
            native_decimals: 18,
        }
    }
}
